use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::model::{Calendar, Index, Reservation, ReservationId};

pub const CALENDAR_FILE: &str = "calendar.snapshot";
pub const INDEX_FILE: &str = "reservations.snapshot";

const SEPARATOR: &str = "::";
const FREE: &str = "null";

/// Snapshot files for the calendar and the reservation index.
///
/// Format: one `key::value` entry per line.
/// - calendar: `YYYY-MM-DD::<reservation id>` or `YYYY-MM-DD::null`
/// - index: `<reservation id>::<reservation as JSON>`
///
/// Each file is written to a temp file, fsynced, then renamed over the old
/// one, so a crash mid-backup leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn calendar_path(&self) -> PathBuf {
        self.dir.join(CALENDAR_FILE)
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    /// True if a calendar snapshot has been written before.
    pub fn exists(&self) -> bool {
        self.calendar_path().exists()
    }

    /// Write both maps. An empty calendar is never written, so a blank engine
    /// can't clobber a good snapshot.
    pub fn backup(&self, calendar: &Calendar, index: &Index) -> io::Result<()> {
        if calendar.is_empty() {
            debug!("snapshot: calendar empty, skipping backup");
            return Ok(());
        }
        fs::create_dir_all(&self.dir)?;

        let mut lines = Vec::with_capacity(calendar.len());
        for (date, owner) in calendar {
            let value = owner.as_ref().map_or(FREE, ReservationId::as_str);
            lines.push(format!("{date}{SEPARATOR}{value}"));
        }
        write_atomic(&self.calendar_path(), &lines)?;

        let mut lines = Vec::with_capacity(index.len());
        for (id, reservation) in index {
            let json = serde_json::to_string(reservation)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            lines.push(format!("{id}{SEPARATOR}{json}"));
        }
        write_atomic(&self.index_path(), &lines)
    }

    /// Best effort: a missing or unreadable file yields an empty calendar.
    pub fn restore_calendar(&self) -> Calendar {
        let path = self.calendar_path();
        read_calendar(&path).unwrap_or_else(|e| {
            log_restore_failure(&path, &e);
            Calendar::new()
        })
    }

    /// Best effort: a missing or unreadable file yields an empty index.
    pub fn restore_index(&self) -> Index {
        let path = self.index_path();
        read_index(&path).unwrap_or_else(|e| {
            log_restore_failure(&path, &e);
            Index::new()
        })
    }
}

fn log_restore_failure(path: &Path, e: &io::Error) {
    if e.kind() == io::ErrorKind::NotFound {
        debug!("snapshot: {} not found", path.display());
    } else {
        warn!("snapshot: failed to restore {}: {e}", path.display());
    }
}

fn write_atomic(path: &Path, lines: &[String]) -> io::Result<()> {
    let tmp_path = path.with_extension("snapshot.tmp");
    let file = File::create(&tmp_path)?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    writer.get_ref().sync_all()?;
    fs::rename(&tmp_path, path)
}

fn parse_err(line_no: usize, msg: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("line {}: {msg}", line_no + 1))
}

/// Read `key::value` lines, skipping blank ones. Values may themselves
/// contain the separator (JSON rarely does, but emails could).
fn read_entries(path: &Path) -> io::Result<Vec<(usize, String, String)>> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let (key, value) = line
            .split_once(SEPARATOR)
            .ok_or_else(|| parse_err(line_no, "missing separator"))?;
        entries.push((line_no, key.to_string(), value.to_string()));
    }
    Ok(entries)
}

fn read_calendar(path: &Path) -> io::Result<Calendar> {
    let mut calendar = Calendar::new();
    for (line_no, key, value) in read_entries(path)? {
        let date: NaiveDate = key.parse().map_err(|e| parse_err(line_no, e))?;
        let owner = match value.as_str() {
            FREE | "" => None,
            id => Some(ReservationId::from(id)),
        };
        calendar.insert(date, owner);
    }
    Ok(calendar)
}

fn read_index(path: &Path) -> io::Result<Index> {
    let mut index = Index::new();
    for (line_no, key, value) in read_entries(path)? {
        let reservation: Reservation =
            serde_json::from_str(&value).map_err(|e| parse_err(line_no, e))?;
        if reservation.id.as_str() != key {
            return Err(parse_err(line_no, format!("key {key} does not match id {}", reservation.id)));
        }
        index.insert(reservation.id.clone(), reservation);
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_store(name: &str) -> SnapshotStore {
        let dir = std::env::temp_dir().join("campsite_test_snapshot").join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        SnapshotStore::new(dir)
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2031, 8, day).unwrap()
    }

    fn sample() -> (Calendar, Index) {
        let id = ReservationId::from("01HZY8K3TQ");
        let reservation = Reservation {
            id: id.clone(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada::lace@example.com".into(),
            start_date: d(2),
            end_date: d(3),
        };
        let mut calendar = Calendar::new();
        calendar.insert(d(1), None);
        calendar.insert(d(2), Some(id.clone()));
        calendar.insert(d(3), Some(id.clone()));
        calendar.insert(d(4), None);
        let mut index = Index::new();
        index.insert(id, reservation);
        (calendar, index)
    }

    #[test]
    fn backup_and_restore() {
        let store = tmp_store("roundtrip");
        let (calendar, index) = sample();
        store.backup(&calendar, &index).unwrap();

        assert!(store.exists());
        assert_eq!(store.restore_calendar(), calendar);
        assert_eq!(store.restore_index(), index);
    }

    #[test]
    fn calendar_file_is_line_oriented() {
        let store = tmp_store("format");
        let (calendar, index) = sample();
        store.backup(&calendar, &index).unwrap();

        let text = fs::read_to_string(store.calendar_path()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "2031-08-01::null",
                "2031-08-02::01HZY8K3TQ",
                "2031-08-03::01HZY8K3TQ",
                "2031-08-04::null",
            ]
        );
        let text = fs::read_to_string(store.index_path()).unwrap();
        assert!(text.starts_with("01HZY8K3TQ::{"));
    }

    #[test]
    fn empty_calendar_is_not_written() {
        let store = tmp_store("empty");
        store.backup(&Calendar::new(), &Index::new()).unwrap();
        assert!(!store.exists());
    }

    #[test]
    fn missing_files_restore_empty() {
        let store = tmp_store("missing");
        assert!(store.restore_calendar().is_empty());
        assert!(store.restore_index().is_empty());
    }

    #[test]
    fn corrupt_calendar_restores_empty() {
        let store = tmp_store("corrupt_calendar");
        fs::write(store.calendar_path(), "2031-08-01::null\nnot a date::null\n").unwrap();
        assert!(store.restore_calendar().is_empty());
    }

    #[test]
    fn corrupt_index_restores_empty() {
        let store = tmp_store("corrupt_index");
        fs::write(store.index_path(), "ABC::{not json\n").unwrap();
        assert!(store.restore_index().is_empty());

        fs::write(store.index_path(), "no separator here\n").unwrap();
        assert!(store.restore_index().is_empty());
    }

    #[test]
    fn mismatched_index_key_is_rejected() {
        let store = tmp_store("mismatch");
        let (calendar, index) = sample();
        store.backup(&calendar, &index).unwrap();
        let text = fs::read_to_string(store.index_path()).unwrap();
        fs::write(store.index_path(), text.replacen("01HZY8K3TQ::", "OTHER::", 1)).unwrap();
        assert!(store.restore_index().is_empty());
    }

    #[test]
    fn backup_overwrites_previous_snapshot() {
        let store = tmp_store("overwrite");
        let (calendar, index) = sample();
        store.backup(&calendar, &index).unwrap();

        let mut smaller = Calendar::new();
        smaller.insert(d(9), None);
        store.backup(&smaller, &Index::new()).unwrap();

        assert_eq!(store.restore_calendar(), smaller);
        assert!(store.restore_index().is_empty());
        assert!(!store.calendar_path().with_extension("snapshot.tmp").exists());
    }
}
