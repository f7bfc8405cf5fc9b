pub mod secret_codec;

pub use secret_codec::{decrypt, encrypt, CodecError};
