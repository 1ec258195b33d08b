use gfs::FsError;

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    Usage = 1,
    CannotOpen = 2,
    Exists = 3,
    InvalidFormat = 4,
    NotFound = 5,
    OutOfSpace = 6,
    InvalidSize = 7,
    Io = 8,
    InvalidName = 9,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<&FsError> for ExitCode {
    fn from(err: &FsError) -> Self {
        match err {
            FsError::CannotOpen(_) => ExitCode::CannotOpen,
            FsError::Exists(_) => ExitCode::Exists,
            FsError::InvalidFormat(_) => ExitCode::InvalidFormat,
            FsError::NotFound(_) => ExitCode::NotFound,
            FsError::OutOfSpace { .. } => ExitCode::OutOfSpace,
            FsError::InvalidSize(_) => ExitCode::InvalidSize,
            FsError::Io(_) => ExitCode::Io,
            FsError::InvalidName(_) => ExitCode::InvalidName,
        }
    }
}
