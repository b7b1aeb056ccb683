//! The date file: a single timestamp used as the incremental-run cutoff
//! (spec §6 "Date file").

use std::fs;
use std::path::Path;

use crate::error::Error;

/// Read `appointmentDate` from `path`. Any timestamp strictly after this
/// is considered "modified" by pass 1.
pub fn read_appointment_date(path: &Path) -> Result<i64, Error> {
    let contents = fs::read_to_string(path)?;
    contents
        .trim()
        .parse()
        .map_err(|_| Error::DataFormat(format!("date file {} does not contain a single timestamp", path.display())))
}

/// Overwrite `path` with `latest_date`, the maximum element timestamp
/// observed during the run, so the next run's cutoff advances.
pub fn write_appointment_date(path: &Path, latest_date: i64) -> Result<(), Error> {
    fs::write(path, latest_date.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn round_trips_a_timestamp() {
        let file = NamedTempFile::new().unwrap();
        write_appointment_date(file.path(), 1_700_000_000).unwrap();
        assert_eq!(read_appointment_date(file.path()).unwrap(), 1_700_000_000);
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "  42\n").unwrap();
        assert_eq!(read_appointment_date(file.path()).unwrap(), 42);
    }

    #[test]
    fn rejects_non_numeric_contents() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "not-a-timestamp").unwrap();
        assert!(read_appointment_date(file.path()).is_err());
    }
}
