use crate::BrimError;

pub trait AttrSink {
    type Error;
    fn send_request(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}

pub trait AttrSource {
    type Error;
    fn recv_current(&mut self) -> Result<Vec<u8>, Self::Error>;
}

/// A full read-write confinement channel as the transition engine consumes
/// it. Blanket-implemented; fakes only need the two halves above.
pub trait AttrChannel: AttrSink<Error = BrimError> + AttrSource<Error = BrimError> {}

impl<T: AttrSink<Error = BrimError> + AttrSource<Error = BrimError>> AttrChannel for T {}
