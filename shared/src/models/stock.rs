//! Stock ledger entities
//!
//! A [`StockItem`] is the running quantity of one product at one storage
//! location. Every applied change produces an immutable [`StockMovement`]
//! carrying before/after snapshots, so the history is self-describing and
//! never needs replay to reconstruct an item's state.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::validation::{
    normalize_notes, require_non_negative, require_positive, ValidationError,
};

/// Kinds of stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Adds `quantity` to the item
    Entry,
    /// Removes `quantity` from the item; rejected when stock is insufficient
    Exit,
    /// Sets the item's quantity to `quantity` (absolute value, not a delta)
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entry => "entry",
            MovementType::Exit => "exit",
            MovementType::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry" => Ok(MovementType::Entry),
            "exit" => Ok(MovementType::Exit),
            "adjustment" => Ok(MovementType::Adjustment),
            other => Err(ValidationError::new(
                "movement_type",
                format!("Unknown movement type: {}", other),
                format!("Tipo de movimento desconhecido: {}", other),
            )),
        }
    }
}

/// The quantity ledger for one (product, location) pair.
///
/// Fields are private; state changes go through the mutation methods below,
/// each of which re-validates the non-negativity invariant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockItem {
    id: Uuid,
    product_id: Uuid,
    location_id: Uuid,
    quantity: Decimal,
    last_purchase_price: Option<Decimal>,
    last_movement_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl StockItem {
    /// Create a new ledger entry for a (product, location) pair.
    pub fn new(
        product_id: Uuid,
        location_id: Uuid,
        initial_quantity: Decimal,
    ) -> Result<Self, ValidationError> {
        if product_id.is_nil() {
            return Err(ValidationError::new(
                "product_id",
                "Product is required",
                "Produto é obrigatório",
            ));
        }
        if location_id.is_nil() {
            return Err(ValidationError::new(
                "location_id",
                "Storage location is required",
                "Local de armazenagem é obrigatório",
            ));
        }
        require_non_negative("initial_quantity", initial_quantity)?;

        Ok(Self {
            id: Uuid::new_v4(),
            product_id,
            location_id,
            quantity: initial_quantity,
            last_purchase_price: None,
            last_movement_at: None,
            created_at: Utc::now(),
            updated_at: None,
        })
    }

    /// Rebuild an item from its persisted form. Used by repositories only;
    /// stored rows are trusted to satisfy the invariants they were written
    /// under.
    #[allow(clippy::too_many_arguments)]
    pub fn from_stored(
        id: Uuid,
        product_id: Uuid,
        location_id: Uuid,
        quantity: Decimal,
        last_purchase_price: Option<Decimal>,
        last_movement_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            product_id,
            location_id,
            quantity,
            last_purchase_price,
            last_movement_at,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn product_id(&self) -> Uuid {
        self.product_id
    }

    pub fn location_id(&self) -> Uuid {
        self.location_id
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn last_purchase_price(&self) -> Option<Decimal> {
        self.last_purchase_price
    }

    pub fn last_movement_at(&self) -> Option<DateTime<Utc>> {
        self.last_movement_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Increase the quantity by a positive amount.
    pub fn add_quantity(&mut self, amount: Decimal) -> Result<(), ValidationError> {
        require_positive("amount", amount)?;
        self.quantity += amount;
        self.touch();
        Ok(())
    }

    /// Decrease the quantity by a positive amount.
    ///
    /// Returns `false` without mutating anything when the available quantity
    /// is insufficient. This is the guarantee that exits never drive the
    /// ledger negative.
    pub fn try_subtract_quantity(&mut self, amount: Decimal) -> Result<bool, ValidationError> {
        require_positive("amount", amount)?;
        if self.quantity < amount {
            return Ok(false);
        }
        self.quantity -= amount;
        self.touch();
        Ok(true)
    }

    /// Set the quantity to a new absolute value.
    pub fn adjust_quantity(&mut self, new_quantity: Decimal) -> Result<(), ValidationError> {
        require_non_negative("new_quantity", new_quantity)?;
        self.quantity = new_quantity;
        self.touch();
        Ok(())
    }

    /// Record the unit price of the most recent purchase.
    pub fn set_last_purchase_price(&mut self, price: Decimal) -> Result<(), ValidationError> {
        if price < Decimal::ZERO {
            return Err(ValidationError::new(
                "price",
                "Price cannot be negative",
                "Preço não pode ser negativo",
            ));
        }
        self.last_purchase_price = Some(price);
        self.updated_at = Some(Utc::now());
        Ok(())
    }

    /// Whether the current quantity is below a minimum threshold.
    pub fn is_below_minimum(&self, minimum: Decimal) -> bool {
        self.quantity < minimum
    }

    fn touch(&mut self) {
        let now = Utc::now();
        self.last_movement_at = Some(now);
        self.updated_at = Some(now);
    }
}

/// An immutable audit record of one applied quantity change.
///
/// Write-once: there are no mutators, only the factory and read accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockMovement {
    id: Uuid,
    stock_item_id: Uuid,
    movement_type: MovementType,
    quantity: Decimal,
    quantity_before: Decimal,
    quantity_after: Decimal,
    notes: Option<String>,
    moved_at: DateTime<Utc>,
}

impl StockMovement {
    /// Create a movement record with its before/after snapshots.
    ///
    /// `quantity` is the requested delta for entries and exits, and the new
    /// absolute value for adjustments; an adjustment to zero is therefore
    /// legal here, while the per-type strict positivity of entries and exits
    /// is the posting engine's responsibility.
    pub fn new(
        stock_item_id: Uuid,
        movement_type: MovementType,
        quantity: Decimal,
        quantity_before: Decimal,
        quantity_after: Decimal,
        notes: Option<&str>,
    ) -> Result<Self, ValidationError> {
        if stock_item_id.is_nil() {
            return Err(ValidationError::new(
                "stock_item_id",
                "Stock item is required",
                "Item de estoque é obrigatório",
            ));
        }
        require_non_negative("quantity", quantity)?;
        require_non_negative("quantity_before", quantity_before)?;
        require_non_negative("quantity_after", quantity_after)?;
        let notes = normalize_notes(notes)?;

        Ok(Self {
            id: Uuid::new_v4(),
            stock_item_id,
            movement_type,
            quantity,
            quantity_before,
            quantity_after,
            notes,
            moved_at: Utc::now(),
        })
    }

    /// Rebuild a movement from its persisted form. Repositories only.
    pub fn from_stored(
        id: Uuid,
        stock_item_id: Uuid,
        movement_type: MovementType,
        quantity: Decimal,
        quantity_before: Decimal,
        quantity_after: Decimal,
        notes: Option<String>,
        moved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            stock_item_id,
            movement_type,
            quantity,
            quantity_before,
            quantity_after,
            notes,
            moved_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stock_item_id(&self) -> Uuid {
        self.stock_item_id
    }

    pub fn movement_type(&self) -> MovementType {
        self.movement_type
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn quantity_before(&self) -> Decimal {
        self.quantity_before
    }

    pub fn quantity_after(&self) -> Decimal {
        self.quantity_after
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn moved_at(&self) -> DateTime<Utc> {
        self.moved_at
    }

    /// The net effect of this movement on the item's quantity.
    pub fn signed_delta(&self) -> Decimal {
        self.quantity_after - self.quantity_before
    }

    pub fn is_entry(&self) -> bool {
        self.movement_type == MovementType::Entry
    }

    pub fn is_exit(&self) -> bool {
        self.movement_type == MovementType::Exit
    }

    pub fn is_adjustment(&self) -> bool {
        self.movement_type == MovementType::Adjustment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr as _;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(quantity: &str) -> StockItem {
        StockItem::new(Uuid::new_v4(), Uuid::new_v4(), dec(quantity)).unwrap()
    }

    #[test]
    fn test_new_item_rejects_nil_references() {
        assert!(StockItem::new(Uuid::nil(), Uuid::new_v4(), Decimal::ZERO).is_err());
        assert!(StockItem::new(Uuid::new_v4(), Uuid::nil(), Decimal::ZERO).is_err());
    }

    #[test]
    fn test_new_item_rejects_negative_quantity() {
        assert!(StockItem::new(Uuid::new_v4(), Uuid::new_v4(), dec("-1")).is_err());
    }

    #[test]
    fn test_add_quantity() {
        let mut item = item("10");
        item.add_quantity(dec("2.5")).unwrap();
        assert_eq!(item.quantity(), dec("12.5"));
        assert!(item.last_movement_at().is_some());
        assert!(item.updated_at().is_some());
    }

    #[test]
    fn test_add_quantity_rejects_non_positive() {
        let mut item = item("10");
        assert!(item.add_quantity(Decimal::ZERO).is_err());
        assert!(item.add_quantity(dec("-1")).is_err());
        assert_eq!(item.quantity(), dec("10"));
    }

    #[test]
    fn test_try_subtract_quantity() {
        let mut item = item("10");
        assert!(item.try_subtract_quantity(dec("3")).unwrap());
        assert_eq!(item.quantity(), dec("7"));
    }

    #[test]
    fn test_try_subtract_insufficient_leaves_item_untouched() {
        let mut item = item("2");
        assert!(!item.try_subtract_quantity(dec("5")).unwrap());
        assert_eq!(item.quantity(), dec("2"));
        assert!(item.last_movement_at().is_none());
    }

    #[test]
    fn test_try_subtract_exact_balance_reaches_zero() {
        let mut item = item("4");
        assert!(item.try_subtract_quantity(dec("4")).unwrap());
        assert_eq!(item.quantity(), Decimal::ZERO);
    }

    #[test]
    fn test_adjust_quantity_is_absolute() {
        let mut item = item("5");
        item.adjust_quantity(Decimal::ZERO).unwrap();
        assert_eq!(item.quantity(), Decimal::ZERO);

        item.adjust_quantity(dec("42")).unwrap();
        assert_eq!(item.quantity(), dec("42"));
    }

    #[test]
    fn test_adjust_quantity_rejects_negative() {
        let mut item = item("5");
        assert!(item.adjust_quantity(dec("-1")).is_err());
        assert_eq!(item.quantity(), dec("5"));
    }

    #[test]
    fn test_last_purchase_price() {
        let mut item = item("5");
        item.set_last_purchase_price(dec("19.90")).unwrap();
        assert_eq!(item.last_purchase_price(), Some(dec("19.90")));
        assert!(item.set_last_purchase_price(dec("-1")).is_err());
    }

    #[test]
    fn test_is_below_minimum() {
        let item = item("5");
        assert!(item.is_below_minimum(dec("6")));
        assert!(!item.is_below_minimum(dec("5")));
    }

    #[test]
    fn test_movement_factory_validations() {
        let item_id = Uuid::new_v4();
        assert!(StockMovement::new(
            Uuid::nil(),
            MovementType::Entry,
            dec("1"),
            Decimal::ZERO,
            dec("1"),
            None,
        )
        .is_err());
        assert!(StockMovement::new(
            item_id,
            MovementType::Entry,
            dec("-1"),
            Decimal::ZERO,
            dec("1"),
            None,
        )
        .is_err());
        assert!(StockMovement::new(
            item_id,
            MovementType::Entry,
            dec("1"),
            dec("-1"),
            dec("1"),
            None,
        )
        .is_err());
        assert!(StockMovement::new(
            item_id,
            MovementType::Entry,
            dec("1"),
            Decimal::ZERO,
            dec("-1"),
            None,
        )
        .is_err());
    }

    #[test]
    fn test_movement_trims_notes() {
        let movement = StockMovement::new(
            Uuid::new_v4(),
            MovementType::Entry,
            dec("1"),
            Decimal::ZERO,
            dec("1"),
            Some("  pallet 7  "),
        )
        .unwrap();
        assert_eq!(movement.notes(), Some("pallet 7"));
    }

    #[test]
    fn test_movement_predicates_and_delta() {
        let movement = StockMovement::new(
            Uuid::new_v4(),
            MovementType::Exit,
            dec("3"),
            dec("10"),
            dec("7"),
            None,
        )
        .unwrap();
        assert!(movement.is_exit());
        assert!(!movement.is_entry());
        assert!(!movement.is_adjustment());
        assert_eq!(movement.signed_delta(), dec("-3"));
    }

    #[test]
    fn test_movement_type_round_trip() {
        for t in [
            MovementType::Entry,
            MovementType::Exit,
            MovementType::Adjustment,
        ] {
            assert_eq!(MovementType::from_str(t.as_str()).unwrap(), t);
        }
        assert!(MovementType::from_str("transfer").is_err());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10_000i64).prop_map(|n| Decimal::new(n, 1)) // 0.1 to 1000.0
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The quantity never goes negative under any sequence of entity
        /// mutations; failed subtractions leave it untouched.
        #[test]
        fn prop_item_quantity_never_negative(
            amounts in prop::collection::vec((prop::bool::ANY, quantity_strategy()), 1..40)
        ) {
            let mut item =
                StockItem::new(Uuid::new_v4(), Uuid::new_v4(), Decimal::ZERO).unwrap();

            for (is_add, amount) in amounts {
                let before = item.quantity();
                if is_add {
                    item.add_quantity(amount).unwrap();
                    prop_assert_eq!(item.quantity(), before + amount);
                } else if item.try_subtract_quantity(amount).unwrap() {
                    prop_assert_eq!(item.quantity(), before - amount);
                } else {
                    prop_assert_eq!(item.quantity(), before);
                }
                prop_assert!(item.quantity() >= Decimal::ZERO);
            }
        }

        /// A movement's signed delta always equals after minus before, and a
        /// subtraction only succeeds when covered by the available quantity.
        #[test]
        fn prop_subtract_succeeds_iff_covered(
            initial in quantity_strategy(),
            amount in quantity_strategy()
        ) {
            let mut item =
                StockItem::new(Uuid::new_v4(), Uuid::new_v4(), initial).unwrap();
            let ok = item.try_subtract_quantity(amount).unwrap();
            prop_assert_eq!(ok, initial >= amount);

            let movement = StockMovement::new(
                item.id(),
                MovementType::Exit,
                amount,
                initial,
                item.quantity(),
                None,
            )
            .unwrap();
            prop_assert_eq!(
                movement.signed_delta(),
                item.quantity() - initial
            );
        }
    }
}
