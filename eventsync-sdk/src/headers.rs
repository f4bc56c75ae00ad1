//! Header, attribute and path names shared by the server and its clients.

/// Path prefix under which events are ingested. The remainder of the path
/// is the event key of the target endpoint.
pub const EVENT_PATH_PREFIX: &str = "/event/";

/// Header name for admin API authentication (plaintext secret).
pub const ADMIN_AUTH_HEADER: &str = "EventSync-Admin-Authorization";

/// Header carrying the service name when an aggregate is delivered to a
/// webhook sink.
pub const SERVICE_NAME_HEADER: &str = "EventSync-Service-Name";

/// Message attribute carrying the service name when an aggregate is
/// published to a topic.
pub const SERVICE_NAME_ATTRIBUTE: &str = "serviceName";
