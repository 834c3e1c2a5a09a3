//! Layout graph: fixtures, products, and the placements that join them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable fixture identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixtureId(pub u32);

impl fmt::Display for FixtureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}

/// Stable placement identity. Caches are keyed by this, never by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlacementId(pub u32);

impl fmt::Display for PlacementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureKind {
    #[default]
    Shelf,
    /// Separator inserted between divider-blocks. Holds no product and
    /// contributes no capacity to its run.
    Divider,
}

/// A shelf segment.
///
/// Segments at one shelf level share a `leftmost` reference; capacity
/// and consumption are always aggregated over that run, never per
/// segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: FixtureId,
    #[serde(default)]
    pub kind: FixtureKind,
    /// Left edge.
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    /// Linear capacity.
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub depth: f64,
    /// Head of the contiguous run this segment belongs to.
    pub leftmost: FixtureId,
}

impl Fixture {
    /// A shelf segment that heads its own run.
    pub fn shelf(id: FixtureId, x: f64, width: f64) -> Self {
        Self {
            id,
            kind: FixtureKind::Shelf,
            x,
            y: 0.0,
            width,
            height: 0.0,
            depth: 0.0,
            leftmost: id,
        }
    }

    /// Joins this segment to the run headed by `leftmost`.
    pub fn in_run(mut self, leftmost: FixtureId) -> Self {
        self.leftmost = leftmost;
        self
    }

    pub fn with_depth(mut self, depth: f64) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_y(mut self, y: f64) -> Self {
        self.y = y;
        self
    }

    pub fn is_divider(&self) -> bool {
        self.kind == FixtureKind::Divider
    }

    /// Whether `x` falls on this segment (left edge inclusive).
    pub fn contains_x(&self, x: f64) -> bool {
        x >= self.x && x < self.x + self.width
    }
}

/// The three classification axes used as grouping keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub larger_block: Option<String>,
    #[serde(default)]
    pub divider_block: Option<String>,
    #[serde(default)]
    pub revisited_block: Option<String>,
}

impl Classification {
    pub fn new(larger_block: &str, divider_block: &str) -> Self {
        Self {
            larger_block: Some(larger_block.to_string()),
            divider_block: Some(divider_block.to_string()),
            revisited_block: None,
        }
    }

    pub fn larger_block(&self) -> Option<&str> {
        non_empty(&self.larger_block)
    }

    pub fn divider_block(&self) -> Option<&str> {
        non_empty(&self.divider_block)
    }

    pub fn revisited_block(&self) -> Option<&str> {
        non_empty(&self.revisited_block)
    }
}

fn non_empty(tag: &Option<String>) -> Option<&str> {
    tag.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Merchandising tags that alter scoring or re-optimization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTags {
    #[serde(default)]
    pub party_size: bool,
    #[serde(default)]
    pub outer_block: bool,
    #[serde(default)]
    pub multi_pack: bool,
    #[serde(default)]
    pub extra: bool,
}

fn default_squeeze() -> f64 {
    1.0
}

fn default_units() -> f64 {
    1.0
}

/// Product descriptive data as it arrives from upstream preparation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    /// Native width of one unit.
    pub width: f64,
    #[serde(default = "default_squeeze")]
    pub squeeze: f64,
    /// Units one facing holds (high x deep).
    #[serde(default = "default_units")]
    pub units_per_facing: f64,
    /// Weekly movement estimate, kept in its source text form.
    #[serde(default)]
    pub movement: String,
    #[serde(default)]
    pub classification: Classification,
    #[serde(default)]
    pub tags: ProductTags,
}

impl Product {
    pub fn new(id: impl Into<String>, width: f64) -> Self {
        Self {
            id: id.into(),
            width,
            squeeze: 1.0,
            units_per_facing: 1.0,
            movement: String::new(),
            classification: Classification::default(),
            tags: ProductTags::default(),
        }
    }

    pub fn with_movement(mut self, movement: f64) -> Self {
        self.movement = movement.to_string();
        self
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }

    pub fn with_tags(mut self, tags: ProductTags) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_units_per_facing(mut self, units: f64) -> Self {
        self.units_per_facing = units;
        self
    }

    pub fn with_squeeze(mut self, squeeze: f64) -> Self {
        self.squeeze = squeeze;
        self
    }

    /// Width one facing occupies on the shelf.
    pub fn merch_width(&self) -> f64 {
        self.width * self.squeeze
    }

    /// Weekly movement. Malformed text is treated as zero.
    pub fn movement_rate(&self) -> f64 {
        parse_or_zero(&self.movement, "movement", &self.id)
    }

    /// Numeric form of the product identifier, used only for tie-breaking.
    ///
    /// Non-digit characters are ignored; an identifier with no digits
    /// yields zero.
    pub fn product_number(&self) -> f64 {
        let digits: String = self.id.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return 0.0;
        }
        parse_or_zero(&digits, "product number", &self.id)
    }
}

fn parse_or_zero(raw: &str, field: &str, product: &str) -> f64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return 0.0;
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            log::warn!("product {product}: malformed {field} {raw:?}, using 0");
            0.0
        }
    }
}

/// One product instance on one fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub id: PlacementId,
    pub fixture: FixtureId,
    pub product: String,
    pub facings: u32,
    /// Absolute horizontal position of the left edge.
    pub x: f64,
    /// Order along the shelf.
    pub rank: u32,
    /// Auxiliary items (trays, signage) that are read but never grown.
    #[serde(default)]
    pub excluded: bool,
}

impl Placement {
    pub fn new(id: PlacementId, fixture: FixtureId, product: impl Into<String>) -> Self {
        Self {
            id,
            fixture,
            product: product.into(),
            facings: 1,
            x: 0.0,
            rank: id.0,
            excluded: false,
        }
    }

    pub fn with_facings(mut self, facings: u32) -> Self {
        self.facings = facings;
        self
    }

    pub fn at(mut self, x: f64) -> Self {
        self.x = x;
        self
    }

    pub fn with_rank(mut self, rank: u32) -> Self {
        self.rank = rank;
        self
    }

    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }
}

/// Terminal-but-non-fatal conditions recorded on the layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutFlags {
    /// Runs whose partitioned span exceeds their capacity.
    #[serde(default)]
    pub capacity_underflow: Vec<FixtureId>,
}

/// The target layout graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub id: String,
    #[serde(default)]
    pub fixtures: Vec<Fixture>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub placements: Vec<Placement>,
    #[serde(default)]
    pub flags: LayoutFlags,
}

impl Layout {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn add_fixture(&mut self, fixture: Fixture) {
        self.fixtures.push(fixture);
    }

    pub fn add_product(&mut self, product: Product) {
        self.products.push(product);
    }

    pub fn add_placement(&mut self, placement: Placement) {
        self.placements.push(placement);
    }

    pub fn fixture(&self, id: FixtureId) -> Option<&Fixture> {
        self.fixtures.iter().find(|f| f.id == id)
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn placement(&self, id: PlacementId) -> Option<&Placement> {
        self.placements.iter().find(|p| p.id == id)
    }

    pub fn placement_mut(&mut self, id: PlacementId) -> Option<&mut Placement> {
        self.placements.iter_mut().find(|p| p.id == id)
    }

    /// Facing counts keyed by placement, in id order.
    pub fn facings(&self) -> Vec<(PlacementId, u32)> {
        let mut out: Vec<_> = self.placements.iter().map(|p| (p.id, p.facings)).collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }

    /// Next free fixture id.
    pub(crate) fn next_fixture_id(&self) -> FixtureId {
        FixtureId(self.fixtures.iter().map(|f| f.id.0 + 1).max().unwrap_or(0))
    }

    /// Checks referential integrity.
    ///
    /// Missing classification tags are not an error; affected
    /// placements are simply never eligible to grow.
    pub fn validate(&self) -> crate::Result<()> {
        use crate::ShelfError;

        for fixture in &self.fixtures {
            if self.fixture(fixture.leftmost).is_none() {
                return Err(ShelfError::UnknownRunHead {
                    fixture: fixture.id,
                    leftmost: fixture.leftmost,
                });
            }
        }
        for placement in &self.placements {
            if self.fixture(placement.fixture).is_none() {
                return Err(ShelfError::UnknownFixture {
                    placement: placement.id,
                    fixture: placement.fixture,
                });
            }
            if self.product(&placement.product).is_none() {
                return Err(ShelfError::UnknownProduct {
                    placement: placement.id,
                    product: placement.product.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merch_width_applies_squeeze() {
        let p = Product::new("100", 2.0).with_squeeze(0.9);
        assert!((p.merch_width() - 1.8).abs() < 1e-12);
    }

    #[test]
    fn test_malformed_movement_is_zero() {
        let mut p = Product::new("100", 1.0);
        p.movement = "12,5".into();
        assert_eq!(p.movement_rate(), 0.0);
        p.movement = " 3.5 ".into();
        assert!((p.movement_rate() - 3.5).abs() < 1e-12);
        p.movement = "NaN".into();
        assert_eq!(p.movement_rate(), 0.0);
    }

    #[test]
    fn test_product_number_ignores_non_digits() {
        assert_eq!(Product::new("UPC-0042", 1.0).product_number(), 42.0);
        assert_eq!(Product::new("tray", 1.0).product_number(), 0.0);
    }

    #[test]
    fn test_blank_classification_is_missing() {
        let c = Classification {
            larger_block: Some("  ".into()),
            divider_block: Some("cola".into()),
            revisited_block: None,
        };
        assert_eq!(c.larger_block(), None);
        assert_eq!(c.divider_block(), Some("cola"));
        assert_eq!(c.revisited_block(), None);
    }

    #[test]
    fn test_validate_reports_unknown_fixture() {
        let mut layout = Layout::new("t");
        layout.add_fixture(Fixture::shelf(FixtureId(0), 0.0, 1.0));
        layout.add_product(Product::new("1", 0.1));
        layout.add_placement(Placement::new(PlacementId(0), FixtureId(9), "1"));
        assert!(matches!(
            layout.validate(),
            Err(crate::ShelfError::UnknownFixture { .. })
        ));
    }

    #[test]
    fn test_validate_reports_unknown_product() {
        let mut layout = Layout::new("t");
        layout.add_fixture(Fixture::shelf(FixtureId(0), 0.0, 1.0));
        layout.add_placement(Placement::new(PlacementId(0), FixtureId(0), "missing"));
        assert!(matches!(
            layout.validate(),
            Err(crate::ShelfError::UnknownProduct { .. })
        ));
    }

    #[test]
    fn test_next_fixture_id() {
        let mut layout = Layout::new("t");
        assert_eq!(layout.next_fixture_id(), FixtureId(0));
        layout.add_fixture(Fixture::shelf(FixtureId(4), 0.0, 1.0));
        assert_eq!(layout.next_fixture_id(), FixtureId(5));
    }
}
