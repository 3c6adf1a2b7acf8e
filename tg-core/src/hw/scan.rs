//! Contiguous index enumeration
//!
//! Thermal zones, hwmon groups and CPUs are all numbered densely from 0.
//! The kernel never leaves holes, so the first missing index ends the scan.

/// Probe indices `0..limit` in order, yielding each probe result until the
/// first index whose probe returns `None`
pub fn scan_contiguous<T, F>(limit: usize, probe: F) -> impl Iterator<Item = T>
where
    F: FnMut(usize) -> Option<T>,
{
    (0..limit).map_while(probe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stops_at_first_gap() {
        let present = [true, true, false, true];
        let found: Vec<usize> = scan_contiguous(present.len(), |i| present[i].then_some(i)).collect();
        assert_eq!(found, vec![0, 1]);
    }

    #[test]
    fn test_respects_limit() {
        let found: Vec<usize> = scan_contiguous(4, Some).collect();
        assert_eq!(found, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_probe_not_called_past_gap() {
        let mut calls = Vec::new();
        let _: Vec<()> = scan_contiguous(10, |i| {
            calls.push(i);
            (i < 2).then_some(())
        })
        .collect();
        assert_eq!(calls, vec![0, 1, 2]);
    }
}
