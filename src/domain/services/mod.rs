mod codec;

pub use codec::RequestCodec;
