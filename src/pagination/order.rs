//! Ordering inputs for connections

use async_graphql::{Enum, InputObject, InputType};

use crate::store::{fields, Clause, Direction, Sort, Value};

/// Possible directions in which to order a list of items.
#[derive(Enum, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl From<OrderDirection> for Direction {
    fn from(direction: OrderDirection) -> Self {
        match direction {
            OrderDirection::Asc => Direction::Asc,
            OrderDirection::Desc => Direction::Desc,
        }
    }
}

/// How an ordering value is written into and read from a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Timestamp,
    Integer,
    Text,
}

/// A sortable document field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderKey {
    pub field: &'static str,
    pub kind: KeyKind,
}

impl OrderKey {
    pub const CREATED_AT: OrderKey = OrderKey {
        field: fields::CREATED_AT,
        kind: KeyKind::Timestamp,
    };
    pub const UPDATED_AT: OrderKey = OrderKey {
        field: fields::UPDATED_AT,
        kind: KeyKind::Timestamp,
    };
    pub const NUMBER: OrderKey = OrderKey {
        field: fields::NUMBER,
        kind: KeyKind::Integer,
    };
    pub const NAME: OrderKey = OrderKey {
        field: fields::NAME,
        kind: KeyKind::Text,
    };
}

/// A GraphQL order-field enum. `Default` is the field used when no order
/// is requested.
pub trait OrderField: Copy + Default + Send + Sync {
    fn key(self) -> OrderKey;
}

/// Properties by which issue connections can be ordered.
#[derive(Enum, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum IssueOrderField {
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl OrderField for IssueOrderField {
    fn key(self) -> OrderKey {
        match self {
            IssueOrderField::CreatedAt => OrderKey::CREATED_AT,
            IssueOrderField::UpdatedAt => OrderKey::UPDATED_AT,
        }
    }
}

/// Properties by which label connections can be ordered.
#[derive(Enum, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LabelOrderField {
    #[default]
    CreatedAt,
    Name,
}

impl OrderField for LabelOrderField {
    fn key(self) -> OrderKey {
        match self {
            LabelOrderField::CreatedAt => OrderKey::CREATED_AT,
            LabelOrderField::Name => OrderKey::NAME,
        }
    }
}

/// Properties by which milestone connections can be ordered.
#[derive(Enum, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MilestoneOrderField {
    #[default]
    CreatedAt,
    Number,
    UpdatedAt,
}

impl OrderField for MilestoneOrderField {
    fn key(self) -> OrderKey {
        match self {
            MilestoneOrderField::CreatedAt => OrderKey::CREATED_AT,
            MilestoneOrderField::Number => OrderKey::NUMBER,
            MilestoneOrderField::UpdatedAt => OrderKey::UPDATED_AT,
        }
    }
}

/// Properties by which repository connections can be ordered.
#[derive(Enum, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RepositoryOrderField {
    #[default]
    CreatedAt,
    Name,
    UpdatedAt,
}

impl OrderField for RepositoryOrderField {
    fn key(self) -> OrderKey {
        match self {
            RepositoryOrderField::CreatedAt => OrderKey::CREATED_AT,
            RepositoryOrderField::Name => OrderKey::NAME,
            RepositoryOrderField::UpdatedAt => OrderKey::UPDATED_AT,
        }
    }
}

/// Ordering options for a connection.
#[derive(InputObject, Debug, Clone, Copy)]
#[graphql(concrete(name = "IssueOrder", params(IssueOrderField)))]
#[graphql(concrete(name = "LabelOrder", params(LabelOrderField)))]
#[graphql(concrete(name = "MilestoneOrder", params(MilestoneOrderField)))]
#[graphql(concrete(name = "RepositoryOrder", params(RepositoryOrderField)))]
pub struct Order<F: InputType> {
    /// The ordering direction.
    pub direction: OrderDirection,
    /// The field to order by.
    pub field: F,
}

/// The active ordering of one connection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub key: OrderKey,
    pub direction: Direction,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self {
            key: OrderKey::CREATED_AT,
            direction: Direction::Asc,
        }
    }
}

impl SortOrder {
    pub fn new(key: OrderKey, direction: Direction) -> Self {
        Self { key, direction }
    }

    /// Resolves an optional order input, falling back to the field's
    /// default ascending.
    pub fn resolve<F: OrderField + InputType>(order: Option<&Order<F>>) -> Self {
        match order {
            Some(order) => Self::new(order.field.key(), order.direction.into()),
            None => Self::new(F::default().key(), Direction::Asc),
        }
    }

    pub fn sort(&self) -> Sort {
        Sort::new(self.key.field, self.direction)
    }

    /// Records strictly after `value` in this order.
    pub fn after(&self, value: Value) -> Clause {
        match self.direction {
            Direction::Asc => Clause::Gt(self.key.field, value),
            Direction::Desc => Clause::Lt(self.key.field, value),
        }
    }

    /// Records strictly before `value` in this order.
    pub fn before(&self, value: Value) -> Clause {
        match self.direction {
            Direction::Asc => Clause::Lt(self.key.field, value),
            Direction::Desc => Clause::Gt(self.key.field, value),
        }
    }
}
