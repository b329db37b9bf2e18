use crate::error::{LedgerError, Result};
use std::io::Read;

/// One scripted call: a function name followed by its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    pub function: String,
    pub args: Vec<String>,
}

/// Reads invocation scripts from a CSV source.
///
/// Rows have no header and a variable number of fields
/// (`function,arg1,arg2,...`). Fields are trimmed, lines starting with `#`
/// are comments, and quoted fields may carry commas, which is how query
/// documents are passed.
pub struct InvocationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> InvocationReader<R> {
    /// Creates a new `InvocationReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .flexible(true)
            .comment(Some(b'#'))
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads invocations.
    ///
    /// Rows whose function field is empty are reported as errors rather than
    /// skipped, so a bad script line is visible to the caller.
    pub fn invocations(self) -> impl Iterator<Item = Result<InvocationRequest>> {
        self.reader.into_records().map(|result| {
            let record = result.map_err(LedgerError::from)?;
            let mut fields = record.iter().map(str::to_string);
            let function = fields.next().filter(|f| !f.is_empty()).ok_or_else(|| {
                LedgerError::ValidationError(format!(
                    "missing function name on line {}",
                    record.position().map_or(0, |p| p.line())
                ))
            })?;
            Ok(InvocationRequest {
                function,
                args: fields.collect(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_valid_stream() {
        let data = "initLedger\ncreateRequireRequest, R1, ATM_2, 30\n# settle it\nreceiveCash,R1,BRINKS\n";
        let reader = InvocationReader::new(data.as_bytes());
        let results: Vec<Result<InvocationRequest>> = reader.invocations().collect();

        assert_eq!(results.len(), 3);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.function, "initLedger");
        assert!(first.args.is_empty());

        let second = results[1].as_ref().unwrap();
        assert_eq!(second.function, "createRequireRequest");
        assert_eq!(second.args, vec!["R1", "ATM_2", "30"]);
    }

    #[test]
    fn test_reader_quoted_query_document() {
        let data = r#"queryEntity,"{""selector"":{""type"":""send""}}""#;
        let reader = InvocationReader::new(data.as_bytes());
        let request = reader.invocations().next().unwrap().unwrap();

        assert_eq!(request.function, "queryEntity");
        assert_eq!(request.args, vec![r#"{"selector":{"type":"send"}}"#]);
    }

    #[test]
    fn test_reader_missing_function() {
        let data = ",R1,ATM_2\n";
        let reader = InvocationReader::new(data.as_bytes());
        let results: Vec<Result<InvocationRequest>> = reader.invocations().collect();

        assert!(results[0].is_err());
    }
}
