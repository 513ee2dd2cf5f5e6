use kwt_domain::RejectCode;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Storage unavailable: {message}")]
	StorageUnavailable { message: String },
}
impl Error {
	pub(crate) fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into() }
	}
}

impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::StorageUnavailable { message: err.to_string() }
	}
}

impl From<kwt_storage::Error> for Error {
	fn from(err: kwt_storage::Error) -> Self {
		match err {
			kwt_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			kwt_storage::Error::Sqlx(inner) => Self::StorageUnavailable { message: inner.to_string() },
			kwt_storage::Error::Redis(inner) =>
				Self::StorageUnavailable { message: inner.to_string() },
		}
	}
}

impl From<RejectCode> for Error {
	fn from(code: RejectCode) -> Self {
		let message = match code {
			RejectCode::RejectEmptyTerm => "term must be non-empty.",
			RejectCode::RejectEmptyCategory => "category must be non-empty.",
			RejectCode::RejectTooLong => "term and category must be at most 256 characters.",
		};

		Self::invalid(message)
	}
}
