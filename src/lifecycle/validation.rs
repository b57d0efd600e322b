use std::ops::RangeInclusive;

/// Ports the listener may bind (IANA registered range)
pub const SERVER_PORT_RANGE: RangeInclusive<i32> = 1024..=49151;
/// Ports the client may target
pub const CLIENT_PORT_RANGE: RangeInclusive<i32> = 1..=65535;

/// Operator input rejected before any network action; Display is the operator message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Server inbound address must not be empty.")]
    EmptyServerAddress,
    #[error("Client outbound address must not be empty.")]
    EmptyClientAddress,
    #[error("Invalid server inbound port. Please enter a valid number.")]
    InvalidServerPort,
    #[error("Invalid client outbound port. Please enter a valid number.")]
    InvalidClientPort,
    #[error("Server inbound port number must be between 1024 and 49151.")]
    ServerPortOutOfRange(i32),
    #[error("Client outbound port number must be between 1 and 65535.")]
    ClientPortOutOfRange(i32),
}

/// Validated start parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSettings {
    pub server_address: String,
    pub server_port: u16,
    pub client_address: String,
    pub client_port: u16,
}

/// Checks the four operator fields in order and stops at the first failure.
///
/// Order: server address, client address, server port number, client port
/// number, server port range, client port range.
pub fn validate(
    server_address: &str,
    client_address: &str,
    server_port: &str,
    client_port: &str,
) -> Result<EndpointSettings, ValidationError> {
    let server_address = server_address.trim();
    if server_address.is_empty() {
        return Err(ValidationError::EmptyServerAddress);
    }

    let client_address = client_address.trim();
    if client_address.is_empty() {
        return Err(ValidationError::EmptyClientAddress);
    }

    let server_port: i32 = server_port
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidServerPort)?;
    let client_port: i32 = client_port
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidClientPort)?;

    let server_port = in_range(server_port, SERVER_PORT_RANGE)
        .ok_or(ValidationError::ServerPortOutOfRange(server_port))?;
    let client_port = in_range(client_port, CLIENT_PORT_RANGE)
        .ok_or(ValidationError::ClientPortOutOfRange(client_port))?;

    Ok(EndpointSettings {
        server_address: server_address.to_string(),
        server_port,
        client_address: client_address.to_string(),
        client_port,
    })
}

/// Checks only the outbound half, for sends that do not start a listener
pub fn validate_client_target(address: &str, port: &str) -> Result<(String, u16), ValidationError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(ValidationError::EmptyClientAddress);
    }

    let port: i32 = port
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidClientPort)?;
    let port =
        in_range(port, CLIENT_PORT_RANGE).ok_or(ValidationError::ClientPortOutOfRange(port))?;

    Ok((address.to_string(), port))
}

fn in_range(port: i32, range: RangeInclusive<i32>) -> Option<u16> {
    range
        .contains(&port)
        .then(|| u16::try_from(port).ok())
        .flatten()
}
