//! Fixed catalog of deployable regions.

use serde::Serialize;

use crate::types::RegionId;
use crate::{Error, Result};

/// A catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub name: &'static str,
    /// The free-tier instance type is not offered here.
    pub free_tier_unsupported: bool,
}

const fn entry(id: &'static str, name: &'static str) -> CatalogEntry {
    CatalogEntry {
        id,
        name,
        free_tier_unsupported: false,
    }
}

const fn unsupported(id: &'static str, name: &'static str) -> CatalogEntry {
    CatalogEntry {
        id,
        name,
        free_tier_unsupported: true,
    }
}

pub const CATALOG: &[CatalogEntry] = &[
    entry("ap-south-1", "India (Mumbai)"),
    entry("eu-west-3", "France"),
    entry("eu-west-2", "United Kingdom"),
    entry("eu-west-1", "Ireland"),
    entry("ap-northeast-3", "Japan (Osaka)"),
    entry("ap-northeast-2", "South Korea"),
    entry("ap-northeast-1", "Japan (Tokyo)"),
    entry("ca-central-1", "Canada"),
    entry("sa-east-1", "Brazil"),
    entry("ap-southeast-1", "Singapore"),
    entry("ap-southeast-2", "Australia (Sydney)"),
    entry("eu-central-1", "Germany"),
    entry("us-east-1", "Virginia"),
    entry("us-east-2", "Ohio"),
    entry("us-west-1", "California"),
    entry("us-west-2", "Oregon"),
    unsupported("ap-east-1", "Hong Kong"),
    unsupported("mx-central-1", "Mexico"),
    unsupported("af-south-1", "South Africa"),
    unsupported("eu-north-1", "Sweden"),
    unsupported("me-central-1", "United Arab Emirates"),
];

/// A region with its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
}

impl From<&CatalogEntry> for Region {
    fn from(e: &CatalogEntry) -> Self {
        Self {
            id: RegionId::from(e.id),
            name: e.name.to_string(),
        }
    }
}

pub fn lookup(id: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|e| e.id == id)
}

/// Display name for a region id, if it is in the catalog.
pub fn region_name(id: &str) -> Option<&'static str> {
    lookup(id).map(|e| e.name)
}

/// Regions that can host a free-tier endpoint, sorted by display name.
pub fn supported() -> Vec<Region> {
    let mut regions: Vec<Region> = CATALOG
        .iter()
        .filter(|e| !e.free_tier_unsupported)
        .map(Region::from)
        .collect();
    sort_by_name(&mut regions);
    regions
}

/// Resolve a region that an endpoint can be deployed into.
pub fn require_deployable(id: &RegionId) -> Result<&'static CatalogEntry> {
    let entry = lookup(id.as_str()).ok_or_else(|| Error::UnknownRegion(id.to_string()))?;
    if entry.free_tier_unsupported {
        return Err(Error::UnsupportedRegion(id.to_string()));
    }
    Ok(entry)
}

/// Case-insensitive sort by display name.
pub fn sort_by_name(regions: &mut [Region]) {
    regions.sort_by_cached_key(|r| r.name.to_lowercase());
}
