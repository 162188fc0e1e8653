//! Parsers for listing-tool output.

use std::fmt;
use std::str::FromStr;
use std::str::Lines;

use thiserror::Error;

use super::ArchiveMember;

/// Output layout produced by the listing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListingFormat {
    /// The table printed by `unzip -l`:
    ///
    /// ```text
    /// Archive:  pack.zip
    ///   Length      Date    Time    Name
    /// ---------  ---------- -----   ----
    ///      1024  2024-03-01 10:15   MyPack/model.obj
    /// ---------                     -------
    ///      1024                     1 file
    /// ```
    #[default]
    UnzipTable,

    /// One `<size> <name>` pair per line, for custom listing tools.
    SizeName,
}

impl fmt::Display for ListingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnzipTable => f.write_str("unzip-table"),
            Self::SizeName => f.write_str("size-name"),
        }
    }
}

impl FromStr for ListingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unzip-table" | "unzip" => Ok(Self::UnzipTable),
            "size-name" => Ok(Self::SizeName),
            other => Err(format!(
                "unknown listing format '{other}' (expected unzip-table or size-name)"
            )),
        }
    }
}

/// Listing output that could not be understood.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {reason}")]
pub struct ListingParseError {
    /// One-based line number, or the line count when input ended early.
    pub line: usize,
    /// What was wrong.
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Rows,
    Done,
}

/// Lazy iterator over the members of a listing.
///
/// Members are produced one line at a time so a caller can stop as soon as
/// a limit is crossed. After the first error the iterator is exhausted.
#[derive(Debug)]
pub struct ListingParser<'a> {
    lines: Lines<'a>,
    format: ListingFormat,
    state: State,
    line_no: usize,
}

/// Parses `output` as `format`.
///
/// # Examples
///
/// ```
/// use packsafe_core::inspection::ListingFormat;
/// use packsafe_core::inspection::parse_listing;
///
/// let output = "120 textures/wood.png\n0 textures/\n";
/// let members: Vec<_> = parse_listing(output, ListingFormat::SizeName)
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(members.len(), 2);
/// assert!(members[1].is_directory());
/// ```
#[must_use]
pub fn parse_listing(output: &str, format: ListingFormat) -> ListingParser<'_> {
    let state = match format {
        ListingFormat::UnzipTable => State::Header,
        ListingFormat::SizeName => State::Rows,
    };
    ListingParser {
        lines: output.lines(),
        format,
        state,
        line_no: 0,
    }
}

impl ListingParser<'_> {
    fn fail(&mut self, reason: impl Into<String>) -> Option<Result<ArchiveMember, ListingParseError>> {
        self.state = State::Done;
        Some(Err(ListingParseError {
            line: self.line_no,
            reason: reason.into(),
        }))
    }

    fn next_table_row(&mut self) -> Option<Result<ArchiveMember, ListingParseError>> {
        loop {
            let Some(line) = self.lines.next() else {
                return match self.state {
                    State::Header => self.fail("no member table in listing"),
                    State::Rows => self.fail("listing ended before closing rule"),
                    State::Done => None,
                };
            };
            self.line_no += 1;
            let trimmed = line.trim_start();

            match self.state {
                State::Header => {
                    if trimmed.starts_with("---") {
                        self.state = State::Rows;
                    }
                }
                State::Rows => {
                    if trimmed.starts_with("---") {
                        self.state = State::Done;
                        return None;
                    }
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Some(self.table_row(line));
                }
                State::Done => return None,
            }
        }
    }

    fn table_row(&mut self, line: &str) -> Result<ArchiveMember, ListingParseError> {
        let parsed = take_fields::<3>(line).and_then(|([size, _date, _time], name)| {
            let size = size.parse::<u64>().ok()?;
            (!name.is_empty()).then(|| ArchiveMember::new(name, size))
        });
        parsed.ok_or_else(|| {
            self.state = State::Done;
            ListingParseError {
                line: self.line_no,
                reason: format!("malformed table row: {line:?}"),
            }
        })
    }

    fn next_size_name(&mut self) -> Option<Result<ArchiveMember, ListingParseError>> {
        if self.state == State::Done {
            return None;
        }
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let parsed = take_fields::<1>(line).and_then(|([size], name)| {
                let size = size.parse::<u64>().ok()?;
                (!name.is_empty()).then(|| ArchiveMember::new(name, size))
            });
            return match parsed {
                Some(member) => Some(Ok(member)),
                None => self.fail(format!("malformed entry: {line:?}")),
            };
        }
    }
}

impl Iterator for ListingParser<'_> {
    type Item = Result<ArchiveMember, ListingParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.format {
            ListingFormat::UnzipTable => self.next_table_row(),
            ListingFormat::SizeName => self.next_size_name(),
        }
    }
}

/// Splits off `N` whitespace-separated fields and returns them with the
/// untouched remainder (member names may contain spaces).
fn take_fields<const N: usize>(line: &str) -> Option<([&str; N], &str)> {
    let mut fields = [""; N];
    let mut rest = line;
    for field in &mut fields {
        rest = rest.trim_start();
        let end = rest.find(char::is_whitespace)?;
        *field = &rest[..end];
        rest = &rest[end..];
    }
    let rest = rest.trim_start();
    Some((fields, rest.trim_end_matches(['\r', '\n'])))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const UNZIP_LISTING: &str = "\
Archive:  Arcade Pack.zip
  Length      Date    Time    Name
---------  ---------- -----   ----
        0  2024-03-01 10:15   MyPack/
   204800  2024-03-01 10:15   MyPack/cabinet model.obj
    51200  2024-03-01 10:15   MyPack/side art.png
---------                     -------
   256000                     3 files
";

    fn collect(output: &str, format: ListingFormat) -> Result<Vec<ArchiveMember>, ListingParseError> {
        parse_listing(output, format).collect()
    }

    #[test]
    fn test_unzip_table() {
        let members = collect(UNZIP_LISTING, ListingFormat::UnzipTable).unwrap();
        assert_eq!(members.len(), 3);
        assert!(members[0].is_directory());
        assert_eq!(members[1], ArchiveMember::new("MyPack/cabinet model.obj", 204_800));
        assert_eq!(members[2].size, 51_200);
    }

    #[test]
    fn test_unzip_table_us_dates() {
        let output = "\
Archive:  a.zip
  Length      Date    Time    Name
---------  ---------- -----   ----
       12  03-01-2024 10:15   notes.txt
---------                     -------
       12                     1 file
";
        let members = collect(output, ListingFormat::UnzipTable).unwrap();
        assert_eq!(members, vec![ArchiveMember::new("notes.txt", 12)]);
    }

    #[test]
    fn test_unzip_table_empty_archive() {
        let output = "\
Archive:  empty.zip
  Length      Date    Time    Name
---------  ---------- -----   ----
---------                     -------
        0                     0 files
";
        assert!(collect(output, ListingFormat::UnzipTable).unwrap().is_empty());
    }

    #[test]
    fn test_unzip_table_without_header_is_error() {
        let err = collect("End-of-central-directory signature not found.\n", ListingFormat::UnzipTable)
            .unwrap_err();
        assert!(err.reason.contains("no member table"));
    }

    #[test]
    fn test_unzip_table_truncated_is_error() {
        let truncated = UNZIP_LISTING.lines().take(4).collect::<Vec<_>>().join("\n");
        let err = collect(&truncated, ListingFormat::UnzipTable).unwrap_err();
        assert!(err.reason.contains("closing rule"));
    }

    #[test]
    fn test_unzip_table_malformed_row() {
        let output = "\
---------  ---------- -----   ----
    lots  2024-03-01 10:15   a.txt
---------
";
        let err = collect(output, ListingFormat::UnzipTable).unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_parser_is_lazy() {
        let mut parser = parse_listing(UNZIP_LISTING, ListingFormat::UnzipTable);
        let first = parser.next().unwrap().unwrap();
        assert_eq!(first.name, "MyPack/");
        assert_eq!(parser.line_no, 4);
    }

    #[test]
    fn test_stops_after_error() {
        let mut parser = parse_listing("1 a\nbad\n2 b\n", ListingFormat::SizeName);
        assert!(parser.next().unwrap().is_ok());
        assert!(parser.next().unwrap().is_err());
        assert!(parser.next().is_none());
    }

    #[test]
    fn test_size_name() {
        let members = collect("10 a.txt\n\n20 dir/with space.png\n", ListingFormat::SizeName).unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[1].name, "dir/with space.png");
    }

    #[test]
    fn test_size_name_missing_name() {
        assert!(collect("10\n", ListingFormat::SizeName).is_err());
        assert!(collect("10   \n", ListingFormat::SizeName).is_err());
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("unzip".parse::<ListingFormat>().unwrap(), ListingFormat::UnzipTable);
        assert_eq!("size-name".parse::<ListingFormat>().unwrap(), ListingFormat::SizeName);
        assert!("tar".parse::<ListingFormat>().is_err());
        assert_eq!(ListingFormat::SizeName.to_string(), "size-name");
    }
}
