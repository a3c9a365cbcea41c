mod public;
mod secret;

pub use self::public::PublicParams;
pub use self::secret::{CipherMode, PlainSecretParams, SecretProtection};
