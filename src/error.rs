/// Errors produced while decoding frames or talking to the hardware.
///
/// Decode failures are ordinary outcomes: the bus carries traffic for other
/// nodes and short frames do occur, so callers typically log and move on.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The declared frame length is below the minimum for this message kind.
    #[error("frame 0x{id:03X} too short - required={required} received={received}")]
    FrameTooShort {
        id: u32,
        required: usize,
        received: usize,
    },
    /// The CAN identifier does not belong to the known message set.
    #[error("unrecognized CAN identifier 0x{0:03X}")]
    UnrecognizedId(u32),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
