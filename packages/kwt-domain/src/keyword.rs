use serde::{Deserialize, Serialize};

pub const MAX_KEYWORD_CHARS: usize = 256;

const LEGACY_SEPARATOR: char = ':';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectCode {
	RejectEmptyTerm,
	RejectEmptyCategory,
	RejectTooLong,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cache member {member:?} is not an encoded term and category pair.")]
pub struct MalformedCompositeKey {
	pub member: String,
}

/// Items decoded from cache members, plus the members that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded<T> {
	pub items: Vec<T>,
	pub malformed: Vec<MalformedCompositeKey>,
}
impl<T> Default for Decoded<T> {
	fn default() -> Self {
		Self { items: Vec::new(), malformed: Vec::new() }
	}
}

/// A searched term together with the category it was searched under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeywordPair {
	pub term: String,
	pub category: String,
}
impl KeywordPair {
	/// Trims both fields and rejects empty or oversized values.
	pub fn parse(term: &str, category: &str) -> Result<Self, RejectCode> {
		let term = term.trim();
		let category = category.trim();

		if term.is_empty() {
			return Err(RejectCode::RejectEmptyTerm);
		}
		if category.is_empty() {
			return Err(RejectCode::RejectEmptyCategory);
		}
		if term.chars().count() > MAX_KEYWORD_CHARS || category.chars().count() > MAX_KEYWORD_CHARS
		{
			return Err(RejectCode::RejectTooLong);
		}

		Ok(Self { term: term.to_string(), category: category.to_string() })
	}

	/// Encodes the pair as a JSON array so neither field can leak into the other.
	pub fn encode_member(&self) -> String {
		serde_json::json!([self.term, self.category]).to_string()
	}

	/// Decodes a cache member written by [`KeywordPair::encode_member`].
	///
	/// Members that are not a JSON pair are read as the older `term:category` form, accepted
	/// only with exactly one separator since anything else is ambiguous.
	pub fn decode_member(member: &str) -> Result<Self, MalformedCompositeKey> {
		let malformed = || MalformedCompositeKey { member: member.to_string() };

		if let Ok((term, category)) = serde_json::from_str::<(String, String)>(member) {
			if term.is_empty() || category.is_empty() {
				return Err(malformed());
			}

			return Ok(Self { term, category });
		}

		let mut parts = member.split(LEGACY_SEPARATOR);

		match (parts.next(), parts.next(), parts.next()) {
			(Some(term), Some(category), None) if !term.is_empty() && !category.is_empty() =>
				Ok(Self { term: term.to_string(), category: category.to_string() }),
			_ => Err(malformed()),
		}
	}

	pub fn in_category(&self, category: Option<&str>) -> bool {
		category.map(|wanted| self.category == wanted).unwrap_or(true)
	}
}
