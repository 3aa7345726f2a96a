pub mod claims;
pub mod codec;
pub mod serializer;
pub mod signer;

pub use claims::{Claims, TokenType};
pub use codec::TokenCodec;
pub use serializer::JwtSerializer;
pub use signer::{HmacSigner, TokenSigner};
