//gapwatch_core/table.rs

use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{GapwatchError, Result};

// ---------------------------------------------------------------------
// Outcome domain
// ---------------------------------------------------------------------

/// Number of distinct outcomes (0..=36).
pub const DOMAIN_SIZE: usize = 37;
pub const MAX_OUTCOME: u8 = 36;

const RED_OUTCOMES: [u8; 18] = [
    1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36,
];

/// One observed pocket. Always in `0..=36`; construction is the only range check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Outcome(u8);

impl Outcome {
    pub const ZERO: Outcome = Outcome(0);

    pub fn new(value: i64) -> Result<Self> {
        if (0..=MAX_OUTCOME as i64).contains(&value) {
            Ok(Outcome(value as u8))
        } else {
            Err(GapwatchError::OutcomeOutOfRange(value))
        }
    }

    #[inline]
    pub fn value(self) -> u8 {
        self.0
    }

    /// All outcomes in ascending order.
    pub fn all() -> impl Iterator<Item = Outcome> {
        (0..=MAX_OUTCOME).map(Outcome)
    }
}

impl TryFrom<i64> for Outcome {
    type Error = GapwatchError;

    fn try_from(value: i64) -> Result<Self> {
        Outcome::new(value)
    }
}

impl From<Outcome> for u8 {
    fn from(o: Outcome) -> u8 {
        o.0
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Set of outcomes packed into the low 37 bits of a `u64`. Iterates ascending.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Outcome>", into = "Vec<Outcome>")]
pub struct OutcomeSet(u64);

impl OutcomeSet {
    pub const EMPTY: OutcomeSet = OutcomeSet(0);

    pub fn full() -> Self {
        OutcomeSet((1u64 << DOMAIN_SIZE) - 1)
    }

    /// Raw bitmask; bit `n` is set when outcome `n` is a member.
    #[inline]
    pub fn bits(self) -> u64 {
        self.0
    }

    /// Inverse of `bits`. Bits above 36 are dropped.
    #[inline]
    pub fn from_bits(bits: u64) -> Self {
        OutcomeSet(bits & Self::full().0)
    }

    #[inline]
    pub fn insert(&mut self, o: Outcome) {
        self.0 |= 1u64 << o.0;
    }

    #[inline]
    pub fn contains(self, o: Outcome) -> bool {
        self.0 & (1u64 << o.0) != 0
    }

    #[inline]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn intersection(self, other: OutcomeSet) -> OutcomeSet {
        OutcomeSet(self.0 & other.0)
    }

    #[inline]
    pub fn union(self, other: OutcomeSet) -> OutcomeSet {
        OutcomeSet(self.0 | other.0)
    }

    pub fn iter(self) -> impl Iterator<Item = Outcome> {
        Outcome::all().filter(move |o| self.contains(*o))
    }

    pub fn to_vec(self) -> Vec<Outcome> {
        self.iter().collect()
    }
}

impl FromIterator<Outcome> for OutcomeSet {
    fn from_iter<I: IntoIterator<Item = Outcome>>(iter: I) -> Self {
        let mut set = OutcomeSet::EMPTY;
        for o in iter {
            set.insert(o);
        }
        set
    }
}

impl From<Vec<Outcome>> for OutcomeSet {
    fn from(v: Vec<Outcome>) -> Self {
        v.into_iter().collect()
    }
}

impl From<OutcomeSet> for Vec<Outcome> {
    fn from(s: OutcomeSet) -> Self {
        s.to_vec()
    }
}

// ---------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Red,
    Black,
    Green,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parity {
    Odd,
    Even,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Range {
    Low,
    High,
    Zero,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dozen {
    First,
    Second,
    Third,
    Zero,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    First,
    Second,
    Third,
    Zero,
}

/// A row of three on the layout (`Row(1)` = 1,2,3 ... `Row(12)` = 34,35,36).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Street {
    Row(u8),
    Zero,
}

impl Color {
    pub const ALL: [Color; 3] = [Color::Red, Color::Black, Color::Green];
}

impl Parity {
    pub const ALL: [Parity; 2] = [Parity::Odd, Parity::Even];
}

impl Range {
    pub const ALL: [Range; 3] = [Range::Low, Range::High, Range::Zero];
}

impl Dozen {
    pub const ALL: [Dozen; 4] = [Dozen::First, Dozen::Second, Dozen::Third, Dozen::Zero];
}

impl Column {
    pub const ALL: [Column; 4] = [Column::First, Column::Second, Column::Third, Column::Zero];
}

impl Street {
    pub const ROWS: u8 = 12;

    /// The twelve rows, without the zero pocket.
    pub fn rows() -> impl Iterator<Item = Street> {
        (1..=Self::ROWS).map(Street::Row)
    }

    // 0 = Zero, 1..=12 = rows, None for an out-of-layout row
    fn index(self) -> Option<usize> {
        match self {
            Street::Zero => Some(0),
            Street::Row(n) if (1..=Self::ROWS).contains(&n) => Some(n as usize),
            Street::Row(_) => None,
        }
    }
}

fn ordinal(n: u8) -> String {
    let suffix = match n {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

/// The six classification axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Attribute {
    Color,
    Parity,
    Range,
    Dozen,
    Column,
    Street,
}

impl Attribute {
    pub const ALL: [Attribute; 6] = [
        Attribute::Color,
        Attribute::Parity,
        Attribute::Range,
        Attribute::Dozen,
        Attribute::Column,
        Attribute::Street,
    ];

    /// Every value of this axis, including its zero value where it has one.
    pub fn values(self) -> Vec<Tag> {
        match self {
            Attribute::Color => Color::ALL.into_iter().map(Tag::Color).collect(),
            Attribute::Parity => Parity::ALL.into_iter().map(Tag::Parity).collect(),
            Attribute::Range => Range::ALL.into_iter().map(Tag::Range).collect(),
            Attribute::Dozen => Dozen::ALL.into_iter().map(Tag::Dozen).collect(),
            Attribute::Column => Column::ALL.into_iter().map(Tag::Column).collect(),
            Attribute::Street => Street::rows()
                .chain(std::iter::once(Street::Zero))
                .map(Tag::Street)
                .collect(),
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Attribute::Color => "color",
            Attribute::Parity => "parity",
            Attribute::Range => "range",
            Attribute::Dozen => "dozen",
            Attribute::Column => "column",
            Attribute::Street => "street",
        }
    }
}

/// A single attribute value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    Color(Color),
    Parity(Parity),
    Range(Range),
    Dozen(Dozen),
    Column(Column),
    Street(Street),
}

impl Tag {
    pub fn attribute(self) -> Attribute {
        match self {
            Tag::Color(_) => Attribute::Color,
            Tag::Parity(_) => Attribute::Parity,
            Tag::Range(_) => Attribute::Range,
            Tag::Dozen(_) => Attribute::Dozen,
            Tag::Column(_) => Attribute::Column,
            Tag::Street(_) => Attribute::Street,
        }
    }

    /// Display label, e.g. `Red`, `Low (1-18)`, `2nd Dozen`, `11th Street`.
    pub fn label(self) -> String {
        match self {
            Tag::Color(c) => format!("{c:?}"),
            Tag::Parity(p) => format!("{p:?}"),
            Tag::Range(Range::Low) => "Low (1-18)".to_string(),
            Tag::Range(Range::High) => "High (19-36)".to_string(),
            Tag::Range(Range::Zero)
            | Tag::Dozen(Dozen::Zero)
            | Tag::Column(Column::Zero)
            | Tag::Street(Street::Zero) => "Zero".to_string(),
            Tag::Dozen(d) => format!("{} Dozen", ordinal(dozen_index(d) as u8)),
            Tag::Column(c) => format!("{} Column", ordinal(column_index(c) as u8)),
            Tag::Street(Street::Row(n)) => format!("{} Street", ordinal(n)),
        }
    }

    /// Stable identifier fragment, e.g. `color-red`, `dozen-2`, `street-zero`.
    pub fn slug(self) -> String {
        let value = match self {
            Tag::Color(c) => format!("{c:?}").to_ascii_lowercase(),
            Tag::Parity(p) => format!("{p:?}").to_ascii_lowercase(),
            Tag::Range(r) => format!("{r:?}").to_ascii_lowercase(),
            Tag::Dozen(Dozen::Zero) | Tag::Column(Column::Zero) | Tag::Street(Street::Zero) => {
                "zero".to_string()
            }
            Tag::Dozen(d) => dozen_index(d).to_string(),
            Tag::Column(c) => column_index(c).to_string(),
            Tag::Street(Street::Row(n)) => n.to_string(),
        };
        format!("{}-{}", self.attribute().slug(), value)
    }

    /// Member outcomes of this value's partition cell.
    pub fn members(self) -> OutcomeSet {
        let p = partitions();
        match self {
            Tag::Color(c) => p.color[c as usize],
            Tag::Parity(v) => p.parity[v as usize],
            Tag::Range(r) => p.range[r as usize],
            Tag::Dozen(d) => p.dozen[d as usize],
            Tag::Column(c) => p.column[c as usize],
            Tag::Street(s) => s.index().map(|i| p.street[i]).unwrap_or_default(),
        }
    }
}

fn dozen_index(d: Dozen) -> usize {
    d as usize + 1
}

fn column_index(c: Column) -> usize {
    c as usize + 1
}

// ---------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------

/// Every attribute of one outcome. Exactly one value per axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutcomeProperties {
    pub color: Color,
    pub parity: Parity,
    pub range: Range,
    pub dozen: Dozen,
    pub column: Column,
    pub street: Street,
}

impl OutcomeProperties {
    pub fn tag(&self, attr: Attribute) -> Tag {
        match attr {
            Attribute::Color => Tag::Color(self.color),
            Attribute::Parity => Tag::Parity(self.parity),
            Attribute::Range => Tag::Range(self.range),
            Attribute::Dozen => Tag::Dozen(self.dozen),
            Attribute::Column => Tag::Column(self.column),
            Attribute::Street => Tag::Street(self.street),
        }
    }

    /// True when every specified tag in `tags` matches. An empty set matches nothing.
    pub fn matches(&self, tags: &TagSet) -> bool {
        let specified = tags.tags();
        !specified.is_empty() && specified.iter().all(|t| self.tag(t.attribute()) == *t)
    }
}

/// Classify an outcome. Zero is Green, Even, and `Zero` on every other axis.
pub fn classify(outcome: Outcome) -> OutcomeProperties {
    let n = outcome.value();
    if n == 0 {
        return OutcomeProperties {
            color: Color::Green,
            parity: Parity::Even,
            range: Range::Zero,
            dozen: Dozen::Zero,
            column: Column::Zero,
            street: Street::Zero,
        };
    }

    let color = if RED_OUTCOMES.contains(&n) { Color::Red } else { Color::Black };
    let parity = if n % 2 == 1 { Parity::Odd } else { Parity::Even };
    let range = if n <= 18 { Range::Low } else { Range::High };
    let dozen = match (n - 1) / 12 {
        0 => Dozen::First,
        1 => Dozen::Second,
        _ => Dozen::Third,
    };
    let column = match (n - 1) % 3 {
        0 => Column::First,
        1 => Column::Second,
        _ => Column::Third,
    };
    let street = Street::Row((n - 1) / 3 + 1);

    OutcomeProperties { color, parity, range, dozen, column, street }
}

/// The six fixed partitions, one member set per axis value. Built once from `classify`.
#[derive(Clone, Debug)]
struct Partitions {
    color: [OutcomeSet; 3],
    parity: [OutcomeSet; 2],
    range: [OutcomeSet; 3],
    dozen: [OutcomeSet; 4],
    column: [OutcomeSet; 4],
    // index 0 = Zero, 1..=12 = rows
    street: [OutcomeSet; 13],
}

fn partitions() -> &'static Partitions {
    static PARTITIONS: OnceLock<Partitions> = OnceLock::new();
    PARTITIONS.get_or_init(|| {
        let mut p = Partitions {
            color: [OutcomeSet::EMPTY; 3],
            parity: [OutcomeSet::EMPTY; 2],
            range: [OutcomeSet::EMPTY; 3],
            dozen: [OutcomeSet::EMPTY; 4],
            column: [OutcomeSet::EMPTY; 4],
            street: [OutcomeSet::EMPTY; 13],
        };
        for o in Outcome::all() {
            let props = classify(o);
            p.color[props.color as usize].insert(o);
            p.parity[props.parity as usize].insert(o);
            p.range[props.range as usize].insert(o);
            p.dozen[props.dozen as usize].insert(o);
            p.column[props.column as usize].insert(o);
            if let Some(i) = props.street.index() {
                p.street[i].insert(o);
            }
        }
        p
    })
}

/// Partition of the domain along one axis: `(value, members)` in value order.
pub fn partition(attr: Attribute) -> Vec<(Tag, OutcomeSet)> {
    attr.values().into_iter().map(|t| (t, t.members())).collect()
}

// ---------------------------------------------------------------------
// Tag sets
// ---------------------------------------------------------------------

/// Partial assignment of attribute values. Unset axes are wildcards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagSet {
    pub color: Option<Color>,
    pub parity: Option<Parity>,
    pub range: Option<Range>,
    pub dozen: Option<Dozen>,
    pub column: Option<Column>,
    pub street: Option<Street>,
}

impl TagSet {
    pub fn with(mut self, tag: Tag) -> Self {
        match tag {
            Tag::Color(v) => self.color = Some(v),
            Tag::Parity(v) => self.parity = Some(v),
            Tag::Range(v) => self.range = Some(v),
            Tag::Dozen(v) => self.dozen = Some(v),
            Tag::Column(v) => self.column = Some(v),
            Tag::Street(v) => self.street = Some(v),
        }
        self
    }

    /// Specified tags in fixed axis order: color, parity, range, dozen, column, street.
    pub fn tags(&self) -> Vec<Tag> {
        let mut out = Vec::with_capacity(6);
        if let Some(v) = self.color { out.push(Tag::Color(v)); }
        if let Some(v) = self.parity { out.push(Tag::Parity(v)); }
        if let Some(v) = self.range { out.push(Tag::Range(v)); }
        if let Some(v) = self.dozen { out.push(Tag::Dozen(v)); }
        if let Some(v) = self.column { out.push(Tag::Column(v)); }
        if let Some(v) = self.street { out.push(Tag::Street(v)); }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.tags().is_empty()
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        iter.into_iter().fold(TagSet::default(), TagSet::with)
    }
}

/// Outcomes satisfying every specified tag. No tags resolves to the empty set.
pub fn resolve_by_tags(tags: &TagSet) -> OutcomeSet {
    let specified = tags.tags();
    if specified.is_empty() {
        return OutcomeSet::EMPTY;
    }
    specified
        .into_iter()
        .fold(OutcomeSet::full(), |acc, t| acc.intersection(t.members()))
}

/// Row-per-outcome view derived from `classify`. Convenience only; resolution
/// goes through the partitions.
pub fn master_table() -> Vec<(Outcome, OutcomeProperties)> {
    Outcome::all().map(|o| (o, classify(o))).collect()
}
