//! Record validation

use crate::{CandidateRecord, IngestError, IngestResult, RequiredField};

/// Reject the batch on the first record with a blank name or phone.
///
/// Rows are reported 1-based over data rows (the header is not counted).
/// Name is checked before phone within a row; notes are optional.
pub fn validate_records(records: &[CandidateRecord]) -> IngestResult<()> {
    for (idx, record) in records.iter().enumerate() {
        let field = if record.name.trim().is_empty() {
            Some(RequiredField::Name)
        } else if record.phone.trim().is_empty() {
            Some(RequiredField::Phone)
        } else {
            None
        };

        if let Some(field) = field {
            return Err(IngestError::Validation {
                row_index: idx + 1,
                field,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_batch_passes() {
        let records = vec![
            CandidateRecord::new("Alice", "1", ""),
            CandidateRecord::new("Bob", "2", "note"),
        ];
        assert!(validate_records(&records).is_ok());
        assert!(validate_records(&[]).is_ok());
    }

    #[test]
    fn test_first_invalid_row_reported() {
        let records = vec![
            CandidateRecord::new("Alice", "1", ""),
            CandidateRecord::new("Bob", "2", ""),
            CandidateRecord::new("Cara", "   ", ""),
            CandidateRecord::new("", "", ""),
        ];
        let err = validate_records(&records).unwrap_err();
        assert_eq!(
            err,
            IngestError::Validation {
                row_index: 3,
                field: RequiredField::Phone
            }
        );
    }

    #[test]
    fn test_name_checked_before_phone() {
        let records = vec![CandidateRecord::new(" ", "", "only a note")];
        let err = validate_records(&records).unwrap_err();
        assert_eq!(err.to_string(), "Row 1: FirstName is required");
    }
}
