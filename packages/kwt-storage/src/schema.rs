pub fn render_schema() -> String {
	let init = include_str!("../../../sql/init.sql");

	expand_includes(init)
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_popular_searches.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_popular_searches.sql")),
				"tables/002_recent_searches.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_recent_searches.sql")),
				_ => out.push_str(line),
			}
		} else if !trimmed.starts_with("--") {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn includes_are_expanded() {
		let sql = render_schema();

		assert!(sql.contains("CREATE TABLE IF NOT EXISTS popular_searches"));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS recent_searches"));
		assert!(!sql.contains("\\ir "));
	}
}
