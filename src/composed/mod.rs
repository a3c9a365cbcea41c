pub mod parser;
pub mod selfsig;
pub mod transferable;

pub use self::parser::{parse_keys, parse_subkey, ParsedKeys, Warning};
pub use self::selfsig::{
    bind_subkey, certify_userid, BindingOptions, CertificationOptions, UserPreferences,
};
pub use self::transferable::{
    write_keys, TransferableKey, TransferableSubkey, TransferableUserId,
};
