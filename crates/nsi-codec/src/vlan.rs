use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Lowest and highest VLAN id the wire format will ever admit.
const MIN_VLAN: u16 = 0;
const MAX_VLAN: u16 = 4096;

/// A compact set of VLAN ids, stored as a sorted run of disjoint inclusive
/// ranges.
///
/// Accepts the textual form `"3, 4, 6-9"` and renders back to the same
/// canonical shape. Ranges are inclusive on both ends and kept normalized:
/// adjacent or overlapping ranges are merged on every mutation.
///
/// # Test
///
/// ```
/// use nsi_aura_codec::VlanRanges;
///
/// let set: VlanRanges = "100-200,1000".parse().unwrap();
/// assert!(set.contains(100));
/// assert!(set.contains(200));
/// assert!(set.contains(1000));
/// assert!(!set.contains(201));
/// assert_eq!(set.to_string(), "100-200,1000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VlanRanges {
    ranges: Vec<(u16, u16)>,
}

impl VlanRanges {
    pub fn empty() -> Self {
        Self { ranges: Vec::new() }
    }

    /// A set containing a single VLAN id.
    pub fn single(vlan: u16) -> crate::Result<Self> {
        Self::from_ranges(vec![(vlan, vlan)])
    }

    fn from_ranges(mut ranges: Vec<(u16, u16)>) -> crate::Result<Self> {
        for &(start, end) in &ranges {
            if start > end {
                return Err(Error::Vlan(format!("inverted range {start}-{end}")));
            }
            if start < MIN_VLAN || end > MAX_VLAN {
                return Err(Error::Vlan(format!(
                    "range {start}-{end} outside [{MIN_VLAN}, {MAX_VLAN}]"
                )));
            }
        }
        ranges.sort_unstable();
        Ok(Self {
            ranges: normalize(ranges),
        })
    }

    /// Build a set from a bag of individual VLAN ids (e.g. every
    /// reservation currently holding a VLAN on some STP).
    pub fn from_members(members: impl IntoIterator<Item = u16>) -> crate::Result<Self> {
        Self::from_ranges(members.into_iter().map(|v| (v, v)).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Whether `vlan` is a member of the set.
    pub fn contains(&self, vlan: u16) -> bool {
        self.ranges
            .binary_search_by(|&(start, end)| {
                if vlan < start {
                    std::cmp::Ordering::Greater
                } else if vlan > end {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Iterate every VLAN id in the set, in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.ranges.iter().flat_map(|&(start, end)| start..=end)
    }

    /// # Test
    ///
    /// ```
    /// use nsi_aura_codec::VlanRanges;
    ///
    /// let a: VlanRanges = "1-10".parse().unwrap();
    /// let b: VlanRanges = "5-15".parse().unwrap();
    /// assert_eq!(a.union(&b).to_string(), "1-15");
    /// ```
    pub fn union(&self, other: &Self) -> Self {
        let mut ranges = self.ranges.clone();
        ranges.extend_from_slice(&other.ranges);
        ranges.sort_unstable();
        Self {
            ranges: normalize(ranges),
        }
    }

    /// # Test
    ///
    /// ```
    /// use nsi_aura_codec::VlanRanges;
    ///
    /// let a: VlanRanges = "1-10".parse().unwrap();
    /// let b: VlanRanges = "5-15".parse().unwrap();
    /// assert_eq!(a.intersection(&b).to_string(), "5-10");
    /// ```
    pub fn intersection(&self, other: &Self) -> Self {
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let (s1, e1) = self.ranges[i];
            let (s2, e2) = other.ranges[j];
            let start = s1.max(s2);
            let end = e1.min(e2);
            if start <= end {
                out.push((start, end));
            }
            if e1 < e2 {
                i += 1;
            } else {
                j += 1;
            }
        }
        Self { ranges: out }
    }

    /// Set difference `self - other`.
    ///
    /// # Test
    ///
    /// ```
    /// use nsi_aura_codec::VlanRanges;
    ///
    /// let a: VlanRanges = "1-10".parse().unwrap();
    /// let b: VlanRanges = "5-15".parse().unwrap();
    /// assert_eq!(a.difference(&b).to_string(), "1-4");
    /// ```
    pub fn difference(&self, other: &Self) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        let mut out = Vec::new();
        for &(start, end) in &self.ranges {
            let mut cursor = start;
            for &(os, oe) in &other.ranges {
                if oe < cursor || os > end {
                    continue;
                }
                if os > cursor {
                    out.push((cursor, os - 1));
                }
                cursor = oe.saturating_add(1).max(cursor);
                if cursor > end {
                    break;
                }
            }
            if cursor <= end {
                out.push((cursor, end));
            }
        }
        Self { ranges: out }
    }

    /// Elements in exactly one of the two sets.
    pub fn symmetric_difference(&self, other: &Self) -> Self {
        self.difference(other).union(&other.difference(self))
    }
}

/// Merge adjacent and overlapping ranges in an already-sorted vector.
fn normalize(ranges: Vec<(u16, u16)>) -> Vec<(u16, u16)> {
    let mut out: Vec<(u16, u16)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        match out.last_mut() {
            Some((_, last_end)) if start <= last_end.saturating_add(1) => {
                if end > *last_end {
                    *last_end = end;
                }
            }
            _ => out.push((start, end)),
        }
    }
    out
}

impl FromStr for VlanRanges {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::empty());
        }

        let mut ranges = Vec::new();
        for part in trimmed.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match part.split_once('-') {
                Some((start, end)) => {
                    let start: u16 = start
                        .trim()
                        .parse()
                        .map_err(|_| Error::Vlan(format!("not a number: {part}")))?;
                    let end: u16 = end
                        .trim()
                        .parse()
                        .map_err(|_| Error::Vlan(format!("not a number: {part}")))?;
                    ranges.push((start, end));
                }
                None => {
                    let vlan: u16 = part
                        .parse()
                        .map_err(|_| Error::Vlan(format!("not a number: {part}")))?;
                    ranges.push((vlan, vlan));
                }
            }
        }
        Self::from_ranges(ranges)
    }
}

impl fmt::Display for VlanRanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .ranges
            .iter()
            .map(|&(start, end)| {
                if start == end {
                    start.to_string()
                } else {
                    format!("{start}-{end}")
                }
            })
            .collect();
        write!(f, "{}", rendered.join(","))
    }
}

impl Serialize for VlanRanges {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for VlanRanges {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// `2 <= vlan <= 4094` is the admissible range for a reservation endpoint
/// (distinct from the STP's own storage range of `[0, 4096]`).
pub fn validate_reservation_vlan(vlan: u16) -> crate::Result<()> {
    if (2..=4094).contains(&vlan) {
        Ok(())
    } else {
        Err(Error::Vlan(format!(
            "vlan {vlan} outside reservable range [2, 4094]"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range() {
        assert!("4097".parse::<VlanRanges>().is_err());
        assert!("4096".parse::<VlanRanges>().is_ok());
    }

    #[test]
    fn boundary_reservation_vlans() {
        assert!(validate_reservation_vlan(1).is_err());
        assert!(validate_reservation_vlan(2).is_ok());
        assert!(validate_reservation_vlan(4094).is_ok());
        assert!(validate_reservation_vlan(4095).is_err());
        assert!(validate_reservation_vlan(4096).is_err());
    }

    #[test]
    fn parse_render_round_trip() {
        for s in ["100-200,1000", "1", "1-2,4-6,8"] {
            let parsed: VlanRanges = s.parse().unwrap();
            assert_eq!(parsed.to_string(), s);
        }
    }

    #[test]
    fn merges_adjacent_ranges_on_union() {
        let a: VlanRanges = "1-5".parse().unwrap();
        let b: VlanRanges = "6-10".parse().unwrap();
        assert_eq!(a.union(&b).to_string(), "1-10");
    }

    #[test]
    fn symmetric_difference() {
        let a: VlanRanges = "1-10".parse().unwrap();
        let b: VlanRanges = "5-15".parse().unwrap();
        assert_eq!(a.symmetric_difference(&b).to_string(), "1-4,11-15");
    }

    #[test]
    fn membership_and_iteration() {
        let set: VlanRanges = "3,4,6-9".parse().unwrap();
        let items: Vec<u16> = set.iter().collect();
        assert_eq!(items, vec![3, 4, 6, 7, 8, 9]);
        assert!(!set.contains(5));
    }
}
