//! Claim keys used by the core. Feature modules keep their own keys next to their populators.

pub const ISS: &str = "iss";
pub const AUD: &str = "aud";
pub const AZP: &str = "azp";
pub const EXP: &str = "exp";
pub const IAT: &str = "iat";
pub const NONCE: &str = "nonce";
pub const SUB: &str = "sub";

pub const NAME: &str = "name";
pub const GIVEN_NAME: &str = "given_name";
pub const FAMILY_NAME: &str = "family_name";
pub const MIDDLE_NAME: &str = "middle_name";
pub const EMAIL: &str = "email";
pub const PICTURE: &str = "picture";
pub const LOCALE: &str = "locale";

pub const MESSAGE_TYPE: &str = "https://purl.imsglobal.org/spec/lti/claim/message_type";
pub const VERSION: &str = "https://purl.imsglobal.org/spec/lti/claim/version";
pub const DEPLOYMENT_ID: &str = "https://purl.imsglobal.org/spec/lti/claim/deployment_id";

pub const LTI_VERSION: &str = "1.3.0";
