// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Selecting scans by number, and the file names that scans are stored in.

use std::path::Path;

use log::debug;

/// Which scans to work on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanSelection {
    One(u32),
    /// Every available scan.
    All,
    /// `first..=last` counting by `countby`. Without `last`, up to the last
    /// available scan.
    Range {
        first: u32,
        last: Option<u32>,
        countby: u32,
    },
    List(Vec<u32>),
}

impl ScanSelection {
    pub fn range(first: u32, last: u32) -> ScanSelection {
        ScanSelection::Range {
            first,
            last: Some(last),
            countby: 1,
        }
    }
}

impl From<u32> for ScanSelection {
    fn from(n: u32) -> Self {
        ScanSelection::One(n)
    }
}

impl From<Vec<u32>> for ScanSelection {
    fn from(v: Vec<u32>) -> Self {
        ScanSelection::List(v)
    }
}

/// The scan numbers named by a selection, whether they exist or not. `None`
/// for selections that depend on the available scans.
pub fn make_num_list(selection: &ScanSelection) -> Option<Vec<u32>> {
    match selection {
        ScanSelection::One(n) => Some(vec![*n]),
        ScanSelection::List(v) => Some(v.clone()),
        ScanSelection::Range {
            first,
            last: Some(last),
            countby,
        } => Some(
            (*first..=*last)
                .step_by((*countby).max(1) as usize)
                .collect(),
        ),
        ScanSelection::Range { last: None, .. } | ScanSelection::All => None,
    }
}

/// The scans of `available` named by `selection`, in ascending order.
pub fn shortlist(selection: &ScanSelection, available: &[u32]) -> Vec<u32> {
    let mut available = available.to_vec();
    available.sort_unstable();
    available.dedup();
    let Some(&last_available) = available.last() else {
        return vec![];
    };

    let wanted = match selection {
        ScanSelection::All => return available,
        ScanSelection::Range {
            first,
            last: None,
            countby,
        } => make_num_list(&ScanSelection::Range {
            first: *first,
            last: Some(last_available),
            countby: *countby,
        }),
        other => make_num_list(other),
    }
    .unwrap_or_default();

    let mut list: Vec<u32> = wanted
        .into_iter()
        .filter(|n| available.binary_search(n).is_ok())
        .collect();
    list.sort_unstable();
    list.dedup();
    debug!("shortlist: {list:?}");
    list
}

/// `prefix + zero-padded number + suffix + "." + ext`, e.g. `EA_0012.h5`.
pub fn scan_file_name(prefix: &str, scan_num: u32, nzeros: usize, suffix: &str, ext: &str) -> String {
    format!("{prefix}{scan_num:0nzeros$}{suffix}.{ext}")
}

/// The scan number in a file name made by [`scan_file_name`].
pub fn scan_num_from_file_name(file_name: &str, prefix: &str, ext: &str) -> Option<u32> {
    let rest = file_name.strip_prefix(prefix)?;
    let stem = rest.strip_suffix(ext)?.strip_suffix('.')?;
    let digits: String = stem.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// The scan numbers of the files in `path` named `prefix<number>...<.ext>`,
/// in ascending order.
pub fn dir_scan_num_list<P: AsRef<Path>>(path: P, prefix: &str, ext: &str) -> std::io::Result<Vec<u32>> {
    let mut list = vec![];
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        if let Some(n) = entry
            .file_name()
            .to_str()
            .and_then(|name| scan_num_from_file_name(name, prefix, ext))
        {
            list.push(n);
        }
    }
    list.sort_unstable();
    list.dedup();
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn num_lists() {
        assert_eq!(make_num_list(&5.into()), Some(vec![5]));
        assert_eq!(make_num_list(&ScanSelection::range(3, 6)), Some(vec![3, 4, 5, 6]));
        let every_other = ScanSelection::Range {
            first: 1,
            last: Some(9),
            countby: 3,
        };
        assert_eq!(make_num_list(&every_other), Some(vec![1, 4, 7]));
        assert_eq!(make_num_list(&vec![9, 2].into()), Some(vec![9, 2]));
        assert_eq!(make_num_list(&ScanSelection::All), None);
    }

    #[test]
    fn shortlists() {
        let available = [12, 3, 5, 7, 9, 10];
        assert_eq!(shortlist(&ScanSelection::All, &available), vec![3, 5, 7, 9, 10, 12]);
        assert_eq!(shortlist(&ScanSelection::range(4, 9), &available), vec![5, 7, 9]);
        let open = ScanSelection::Range {
            first: 9,
            last: None,
            countby: 1,
        };
        assert_eq!(shortlist(&open, &available), vec![9, 10, 12]);
        assert_eq!(shortlist(&vec![12, 4, 3].into(), &available), vec![3, 12]);
        assert!(shortlist(&ScanSelection::All, &[]).is_empty());
    }

    #[test]
    fn file_names() {
        assert_eq!(scan_file_name("EA_", 12, 4, "", "h5"), "EA_0012.h5");
        assert_eq!(scan_file_name("ARPES_", 12345, 4, "_a", "mda"), "ARPES_12345_a.mda");
        assert_eq!(scan_num_from_file_name("EA_0012.h5", "EA_", "h5"), Some(12));
        assert_eq!(scan_num_from_file_name("EA_0012_a.h5", "EA_", "h5"), Some(12));
        assert_eq!(scan_num_from_file_name("EA_0012.nc", "EA_", "h5"), None);
        assert_eq!(scan_num_from_file_name("Kappa_0012.h5", "EA_", "h5"), None);
    }

    #[test]
    fn directory_listing() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["EA_0003.h5", "EA_0001.h5", "EA_0002.nc", "notes.txt", "EA_.h5"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        assert_eq!(dir_scan_num_list(dir.path(), "EA_", "h5").unwrap(), vec![1, 3]);
        assert!(dir_scan_num_list(dir.path().join("missing"), "EA_", "h5").is_err());
    }
}
