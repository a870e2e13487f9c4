//! # Sale Allocation Form
//!
//! The single owner of an open sale's [`AllocationState`]. It routes form
//! events to the allocation engine and commits each result in one step.
//!
//! ## Event Routing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Form Event → Engine Operation                        │
//! │                                                                         │
//! │  Frontend Action            FormEvent               Engine Call         │
//! │  ───────────────            ─────────               ───────────         │
//! │                                                                         │
//! │  Pick / change items ─────► LineItemsChanged ─────► distribute          │
//! │                                                                         │
//! │  Click "Add method" ──────► EntryAdded ───────────► distribute          │
//! │                                                                         │
//! │  Click remove ────────────► EntryRemoved ─────────► distribute          │
//! │                                                                         │
//! │  Type a discount ─────────► DiscountEdited ───────► distribute          │
//! │                                                                         │
//! │  Pick a method ───────────► MethodSelected ───────► adopt discount,     │
//! │                                                     distribute          │
//! │                                                                         │
//! │  Type an amount ──────────► AmountEdited ─────────► redistribute        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Phases
//! ```text
//!            begin_edit(index, field)
//!   Settled ─────────────────────────► Editing { index, field }
//!      ▲                                      │
//!      └──────────── apply(event) ────────────┘
//! ```
//!
//! `apply` works on a copy of the entries. The typed value travels inside
//! the event, so the engine never reads a half-written row, and the result
//! replaces the committed list in a single assignment. A rejected event
//! leaves both the entries and the phase as they were.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ts_rs::TS;
use uuid::Uuid;

use crate::allocation::{AllocationEntry, AllocationState};
use crate::config::AllocationConfig;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::submission::SalePaymentPlan;
use crate::types::{
    PaymentMethodId, PaymentMethodInfo, Percentage, SalePaymentRecord, SubtotalProvider,
};
use crate::validation::{validate_allocation, validate_entry_count, AllocationReport, ValidationResult};

// =============================================================================
// Payment Method Catalog
// =============================================================================

/// Lookup into the store's payment methods.
pub trait PaymentMethodCatalog {
    /// Returns the method with this id, active or not.
    fn lookup(&self, id: PaymentMethodId) -> Option<PaymentMethodInfo>;
}

impl PaymentMethodCatalog for HashMap<PaymentMethodId, PaymentMethodInfo> {
    fn lookup(&self, id: PaymentMethodId) -> Option<PaymentMethodInfo> {
        self.get(&id).cloned()
    }
}

impl PaymentMethodCatalog for [PaymentMethodInfo] {
    fn lookup(&self, id: PaymentMethodId) -> Option<PaymentMethodInfo> {
        self.iter().find(|m| m.id == id).cloned()
    }
}

impl PaymentMethodCatalog for Vec<PaymentMethodInfo> {
    fn lookup(&self, id: PaymentMethodId) -> Option<PaymentMethodInfo> {
        self.as_slice().lookup(id)
    }
}

impl<T: PaymentMethodCatalog + ?Sized> PaymentMethodCatalog for &T {
    fn lookup(&self, id: PaymentMethodId) -> Option<PaymentMethodInfo> {
        (**self).lookup(id)
    }
}

// =============================================================================
// Events and Phases
// =============================================================================

/// Something the cashier did in the payment section of the sale form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum FormEvent {
    /// The selected products changed, and with them the subtotal.
    LineItemsChanged { subtotal: Money },
    /// A new, unset payment row was appended.
    EntryAdded,
    EntryRemoved { index: usize },
    DiscountEdited { index: usize, discount: Percentage },
    MethodSelected { index: usize, method_id: PaymentMethodId },
    /// An amount typed directly into a payment row.
    AmountEdited { index: usize, amount: Money },
}

/// Which input of a payment row has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum EditField {
    Discount,
    Amount,
}

/// Whether the entries are consistent with the subtotal or a keystroke
/// is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(tag = "phase", rename_all = "snake_case")]
#[ts(export)]
pub enum FormPhase {
    #[default]
    Settled,
    Editing { index: usize, field: EditField },
}

// =============================================================================
// Sale Allocation Form
// =============================================================================

/// Controller for the payment section of one open sale form.
#[derive(Debug, Clone)]
pub struct SaleAllocationForm<C> {
    id: Uuid,
    state: AllocationState,
    config: AllocationConfig,
    catalog: C,
    phase: FormPhase,
}

impl<C: PaymentMethodCatalog> SaleAllocationForm<C> {
    /// Opens a form for a new sale: one unset row, zero subtotal.
    pub fn new_sale(catalog: C, config: AllocationConfig) -> Self {
        let form = SaleAllocationForm {
            id: Uuid::new_v4(),
            state: AllocationState::new_sale(),
            config,
            catalog,
            phase: FormPhase::Settled,
        };
        info!(form_id = %form.id, strategy = %form.config.strategy, "Opened new sale form");
        form
    }

    /// Opens a form for an existing sale.
    ///
    /// Persisted amounts are kept as stored; nothing is redistributed
    /// until the cashier changes something.
    pub fn edit_sale(
        catalog: C,
        config: AllocationConfig,
        subtotal: Money,
        records: &[SalePaymentRecord],
    ) -> Self {
        let form = SaleAllocationForm {
            id: Uuid::new_v4(),
            state: AllocationState::from_records(subtotal, records),
            config,
            catalog,
            phase: FormPhase::Settled,
        };
        info!(
            form_id = %form.id,
            entries = form.state.entries.len(),
            subtotal = %subtotal,
            "Opened sale form for editing"
        );
        form
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Correlation id for this form's log events.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &AllocationState {
        &self.state
    }

    pub fn entries(&self) -> &[AllocationEntry] {
        &self.state.entries
    }

    pub fn subtotal(&self) -> Money {
        self.state.subtotal
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    pub fn final_total(&self) -> Money {
        self.state.final_total()
    }

    pub fn total_discount(&self) -> Money {
        self.state.total_discount()
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Marks a field of `entries[index]` as being typed into.
    pub fn begin_edit(&mut self, index: usize, field: EditField) -> CoreResult<()> {
        self.check_index(index)?;
        self.phase = FormPhase::Editing { index, field };
        debug!(form_id = %self.id, index, ?field, "Editing payment entry");
        Ok(())
    }

    /// Checks the subtotal source, then applies [`FormEvent::LineItemsChanged`].
    ///
    /// A line item with an invalid quantity is rejected before the
    /// subtotal is touched.
    pub fn set_line_items<S: SubtotalProvider + ?Sized>(&mut self, items: &S) -> CoreResult<()> {
        items.check()?;
        self.apply(FormEvent::LineItemsChanged {
            subtotal: items.subtotal(),
        })
    }

    /// Routes one event to the engine and commits the result.
    pub fn apply(&mut self, event: FormEvent) -> CoreResult<()> {
        let strategy = self.config.strategy;
        let mut subtotal = self.state.subtotal;
        let mut entries = self.state.entries.clone();

        match &event {
            FormEvent::LineItemsChanged { subtotal: new_subtotal } => {
                subtotal = *new_subtotal;
                strategy.distribute(&mut entries, subtotal);
            }
            FormEvent::EntryAdded => {
                let max = self.config.max_payment_methods;
                validate_entry_count(entries.len(), max)
                    .map_err(|_| CoreError::TooManyPaymentMethods { max })?;
                entries.push(AllocationEntry::unset());
                strategy.distribute(&mut entries, subtotal);
            }
            FormEvent::EntryRemoved { index } => {
                self.check_index(*index)?;
                if entries.len() == 1 {
                    return Err(CoreError::CannotRemoveLastEntry);
                }
                entries.remove(*index);
                strategy.distribute(&mut entries, subtotal);
            }
            FormEvent::DiscountEdited { index, discount } => {
                self.check_index(*index)?;
                entries[*index].discount = *discount;
                strategy.distribute(&mut entries, subtotal);
            }
            FormEvent::MethodSelected { index, method_id } => {
                self.check_index(*index)?;
                let method = self.selectable_method(*method_id)?;
                let entry = &mut entries[*index];
                entry.method_id = Some(method.id);
                entry.discount = method.discount;
                strategy.distribute(&mut entries, subtotal);
            }
            FormEvent::AmountEdited { index, amount } => {
                strategy.redistribute(&mut entries, subtotal, *index, *amount)?;
            }
        }

        self.state.subtotal = subtotal;
        self.state.entries = entries;
        self.phase = FormPhase::Settled;

        debug!(
            form_id = %self.id,
            ?event,
            final_total = %self.state.final_total(),
            "Applied form event"
        );
        Ok(())
    }

    // =========================================================================
    // Validation and Submission
    // =========================================================================

    /// Checks the committed entries; drift comes back as a warning.
    pub fn validate(&self) -> ValidationResult<AllocationReport> {
        validate_allocation(&self.state.entries, self.state.subtotal)
    }

    /// Builds the payment part of the create/update request.
    pub fn submit(&self) -> CoreResult<SalePaymentPlan> {
        let plan = SalePaymentPlan::from_entries(&self.state.entries, self.state.subtotal)?;
        info!(
            form_id = %self.id,
            total_price = %plan.total_price,
            methods = plan.payment_methods.len(),
            "Sale payments ready for submission"
        );
        Ok(plan)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn check_index(&self, index: usize) -> CoreResult<()> {
        let len = self.state.entries.len();
        if index < len {
            Ok(())
        } else {
            Err(CoreError::EntryIndexOutOfRange { index, len })
        }
    }

    fn selectable_method(&self, id: PaymentMethodId) -> CoreResult<PaymentMethodInfo> {
        let method = self
            .catalog
            .lookup(id)
            .ok_or(CoreError::PaymentMethodNotFound(id))?;
        if !method.is_active {
            return Err(CoreError::PaymentMethodInactive {
                id,
                name: method.name,
            });
        }
        Ok(method)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::AllocationStrategy;
    use crate::error::ValidationError;
    use crate::types::LineItem;

    fn method(id: i64, name: &str, discount_percent: u32, is_active: bool) -> PaymentMethodInfo {
        PaymentMethodInfo {
            id: PaymentMethodId::new(id).unwrap(),
            name: name.to_string(),
            discount: Percentage::from_percent(discount_percent),
            is_active,
        }
    }

    fn catalog() -> Vec<PaymentMethodInfo> {
        vec![
            method(1, "Card", 0, true),
            method(2, "Cash", 10, true),
            method(3, "Voucher", 100, true),
            method(4, "Cheque", 0, false),
            method(5, "Loyalty", 50, true),
        ]
    }

    fn id(raw: i64) -> PaymentMethodId {
        PaymentMethodId::new(raw).unwrap()
    }

    fn amounts<C: PaymentMethodCatalog>(form: &SaleAllocationForm<C>) -> Vec<i64> {
        form.entries().iter().map(|e| e.amount.cents()).collect()
    }

    /// Scenario B set up through events: Card + Cash over $100.
    fn card_and_cash() -> SaleAllocationForm<Vec<PaymentMethodInfo>> {
        let mut form = SaleAllocationForm::new_sale(catalog(), AllocationConfig::default());
        form.apply(FormEvent::MethodSelected { index: 0, method_id: id(1) }).unwrap();
        form.apply(FormEvent::EntryAdded).unwrap();
        form.apply(FormEvent::MethodSelected { index: 1, method_id: id(2) }).unwrap();
        form.apply(FormEvent::LineItemsChanged {
            subtotal: Money::from_cents(10_000),
        })
        .unwrap();
        form
    }

    #[test]
    fn test_new_sale_starts_with_one_unset_entry() {
        let form = SaleAllocationForm::new_sale(catalog(), AllocationConfig::default());
        assert_eq!(form.entries(), &[AllocationEntry::unset()]);
        assert!(form.subtotal().is_zero());
        assert_eq!(form.phase(), FormPhase::Settled);
    }

    #[test]
    fn test_line_items_changed_distributes() {
        let form = card_and_cash();
        assert_eq!(amounts(&form), vec![5000, 4500]);
        assert_eq!(form.final_total().cents(), 9500);
        assert_eq!(form.total_discount().cents(), 500);
    }

    #[test]
    fn test_set_line_items_uses_subtotal_provider() {
        let mut form = card_and_cash();
        let items = vec![
            LineItem { product_id: 10, quantity: 3, unit_price: Money::from_cents(1000) },
            LineItem { product_id: 11, quantity: 1, unit_price: Money::from_cents(6000) },
        ];
        form.set_line_items(items.as_slice()).unwrap();

        assert_eq!(form.subtotal().cents(), 9000);
        assert_eq!(amounts(&form), vec![4500, 4050]);
    }

    #[test]
    fn test_amount_edit_redistributes() {
        let mut form = card_and_cash();
        form.begin_edit(0, EditField::Amount).unwrap();
        assert_eq!(form.phase(), FormPhase::Editing { index: 0, field: EditField::Amount });

        form.apply(FormEvent::AmountEdited { index: 0, amount: Money::from_cents(8000) })
            .unwrap();

        assert_eq!(amounts(&form), vec![8000, 1800]);
        assert_eq!(form.phase(), FormPhase::Settled);
    }

    #[test]
    fn test_discount_edit_resets_all_amounts() {
        let mut form = card_and_cash();
        form.apply(FormEvent::AmountEdited { index: 0, amount: Money::from_cents(8000) })
            .unwrap();
        form.apply(FormEvent::DiscountEdited {
            index: 0,
            discount: Percentage::from_percent(20),
        })
        .unwrap();

        assert_eq!(amounts(&form), vec![4000, 4500]);
    }

    #[test]
    fn test_method_selection_adopts_catalog_discount() {
        let mut form = card_and_cash();
        form.apply(FormEvent::MethodSelected { index: 0, method_id: id(2) }).unwrap();
        assert_eq!(form.entries()[0].discount, Percentage::from_percent(10));
        assert_eq!(amounts(&form), vec![4500, 4500]);

        // Swapping back adopts 0%, not the previous 10%.
        form.apply(FormEvent::MethodSelected { index: 0, method_id: id(1) }).unwrap();
        assert!(form.entries()[0].discount.is_zero());
        assert_eq!(amounts(&form), vec![5000, 4500]);
    }

    #[test]
    fn test_full_discount_method_charges_nothing() {
        let mut form = card_and_cash();
        form.apply(FormEvent::MethodSelected { index: 1, method_id: id(3) }).unwrap();
        assert_eq!(amounts(&form), vec![5000, 0]);

        form.apply(FormEvent::AmountEdited { index: 1, amount: Money::from_cents(700) })
            .unwrap();
        assert_eq!(amounts(&form), vec![10_000, 0]);
    }

    #[test]
    fn test_unknown_or_inactive_method_is_rejected() {
        let mut form = card_and_cash();
        let before = form.state().clone();

        let result = form.apply(FormEvent::MethodSelected { index: 0, method_id: id(99) });
        assert!(matches!(result, Err(CoreError::PaymentMethodNotFound(_))));

        let result = form.apply(FormEvent::MethodSelected { index: 0, method_id: id(4) });
        assert!(matches!(result, Err(CoreError::PaymentMethodInactive { .. })));

        assert_eq!(form.state(), &before);
    }

    #[test]
    fn test_entry_added_and_removed() {
        let mut form = card_and_cash();
        form.apply(FormEvent::EntryAdded).unwrap();
        assert_eq!(form.entries().len(), 3);
        assert_eq!(amounts(&form), vec![3333, 3000, 3334]);

        form.apply(FormEvent::EntryRemoved { index: 2 }).unwrap();
        assert_eq!(amounts(&form), vec![5000, 4500]);
    }

    #[test]
    fn test_cannot_exceed_max_payment_methods() {
        let config = AllocationConfig {
            max_payment_methods: 2,
            ..AllocationConfig::default()
        };
        let mut form = SaleAllocationForm::new_sale(catalog(), config);
        form.apply(FormEvent::EntryAdded).unwrap();

        assert!(matches!(
            form.apply(FormEvent::EntryAdded),
            Err(CoreError::TooManyPaymentMethods { max: 2 })
        ));
        assert_eq!(form.entries().len(), 2);
    }

    #[test]
    fn test_cannot_remove_last_entry() {
        let mut form = SaleAllocationForm::new_sale(catalog(), AllocationConfig::default());
        assert!(matches!(
            form.apply(FormEvent::EntryRemoved { index: 0 }),
            Err(CoreError::CannotRemoveLastEntry)
        ));
        assert_eq!(form.entries().len(), 1);
    }

    #[test]
    fn test_out_of_range_index_leaves_state_untouched() {
        let mut form = card_and_cash();
        form.begin_edit(1, EditField::Discount).unwrap();
        let before = form.state().clone();

        assert!(form.begin_edit(5, EditField::Amount).is_err());
        assert!(form
            .apply(FormEvent::AmountEdited { index: 5, amount: Money::from_cents(1) })
            .is_err());
        assert!(form
            .apply(FormEvent::DiscountEdited { index: 2, discount: Percentage::zero() })
            .is_err());

        assert_eq!(form.state(), &before);
        assert_eq!(form.phase(), FormPhase::Editing { index: 1, field: EditField::Discount });
    }

    #[test]
    fn test_edit_sale_keeps_persisted_amounts() {
        let records = vec![
            SalePaymentRecord {
                payment_method_id: id(1),
                payment_method_name: "Card".to_string(),
                amount: Money::from_cents(3000),
                discount: Percentage::zero(),
            },
            SalePaymentRecord {
                payment_method_id: id(2),
                payment_method_name: "Cash".to_string(),
                amount: Money::from_cents(6300),
                discount: Percentage::from_percent(10),
            },
        ];
        let form = SaleAllocationForm::edit_sale(
            catalog(),
            AllocationConfig::default(),
            Money::from_cents(10_000),
            &records,
        );

        assert_eq!(amounts(&form), vec![3000, 6300]);
        assert_eq!(form.final_total().cents(), 9300);
        assert!(form.validate().unwrap().is_consistent());
    }

    fn proportional_config() -> AllocationConfig {
        AllocationConfig {
            strategy: AllocationStrategy::ProportionalByCoverage,
            ..AllocationConfig::default()
        }
    }

    #[test]
    fn test_proportional_added_row_takes_a_share() {
        let mut form = SaleAllocationForm::new_sale(catalog(), proportional_config());
        form.apply(FormEvent::MethodSelected { index: 0, method_id: id(1) }).unwrap();
        form.apply(FormEvent::LineItemsChanged { subtotal: Money::from_cents(10_000) })
            .unwrap();
        assert_eq!(amounts(&form), vec![10_000]);

        form.apply(FormEvent::EntryAdded).unwrap();
        assert_eq!(amounts(&form), vec![5000, 5000]);

        // Loyalty is 50% off, so it covers twice as much for the same charge.
        form.apply(FormEvent::MethodSelected { index: 1, method_id: id(5) }).unwrap();
        form.apply(FormEvent::LineItemsChanged { subtotal: Money::from_cents(9000) })
            .unwrap();
        assert_eq!(amounts(&form), vec![3000, 3000]);
        assert!(form.validate().unwrap().is_consistent());
    }

    #[test]
    fn test_proportional_discount_edit_reweights() {
        let mut form = SaleAllocationForm::new_sale(catalog(), proportional_config());
        form.apply(FormEvent::MethodSelected { index: 0, method_id: id(1) }).unwrap();
        form.apply(FormEvent::EntryAdded).unwrap();
        form.apply(FormEvent::MethodSelected { index: 1, method_id: id(5) }).unwrap();
        form.apply(FormEvent::LineItemsChanged { subtotal: Money::from_cents(9000) })
            .unwrap();
        assert_eq!(amounts(&form), vec![3000, 3000]);

        form.apply(FormEvent::DiscountEdited { index: 1, discount: Percentage::zero() })
            .unwrap();
        assert_eq!(amounts(&form), vec![4500, 4500]);
    }

    #[test]
    fn test_proportional_edit_sale_keeps_amounts_until_changed() {
        let records = vec![
            SalePaymentRecord {
                payment_method_id: id(1),
                payment_method_name: "Card".to_string(),
                amount: Money::from_cents(8000),
                discount: Percentage::zero(),
            },
            SalePaymentRecord {
                payment_method_id: id(5),
                payment_method_name: "Loyalty".to_string(),
                amount: Money::from_cents(1000),
                discount: Percentage::from_percent(50),
            },
        ];
        let mut form = SaleAllocationForm::edit_sale(
            catalog(),
            proportional_config(),
            Money::from_cents(10_000),
            &records,
        );
        assert_eq!(amounts(&form), vec![8000, 1000]);

        form.apply(FormEvent::LineItemsChanged { subtotal: Money::from_cents(9000) })
            .unwrap();
        assert_eq!(amounts(&form), vec![3000, 3000]);
    }

    #[test]
    fn test_set_line_items_rejects_bad_quantity() {
        let mut form = card_and_cash();
        let before = form.state().clone();

        let zero = [LineItem { product_id: 1, quantity: 0, unit_price: Money::from_cents(500) }];
        assert!(matches!(
            form.set_line_items(zero.as_slice()),
            Err(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));

        let huge = [LineItem { product_id: 1, quantity: 1000, unit_price: Money::from_cents(1) }];
        assert!(matches!(
            form.set_line_items(huge.as_slice()),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        assert_eq!(form.state(), &before);

        // Clearing every item is allowed and zeroes the split.
        let none: [LineItem; 0] = [];
        form.set_line_items(none.as_slice()).unwrap();
        assert_eq!(amounts(&form), vec![0, 0]);
    }

    #[test]
    fn test_submit() {
        let form = card_and_cash();
        let plan = form.submit().unwrap();
        assert_eq!(plan.payment_methods.len(), 2);
        assert_eq!(plan.total_price.cents(), 9500);

        let empty = SaleAllocationForm::new_sale(catalog(), AllocationConfig::default());
        assert!(matches!(empty.submit(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_catalog_implementations() {
        let list = catalog();
        let map: HashMap<PaymentMethodId, PaymentMethodInfo> =
            list.iter().map(|m| (m.id, m.clone())).collect();

        assert_eq!(map.lookup(id(2)).map(|m| m.name), Some("Cash".to_string()));
        assert_eq!(list.as_slice().lookup(id(3)).map(|m| m.name), Some("Voucher".to_string()));
        assert!(list.lookup(id(42)).is_none());

        // Borrowed catalogs work as form backends too.
        let mut form = SaleAllocationForm::new_sale(&map, AllocationConfig::default());
        form.apply(FormEvent::MethodSelected { index: 0, method_id: id(2) }).unwrap();
        assert_eq!(form.entries()[0].method_id, Some(id(2)));
    }

    #[test]
    fn test_form_event_json_shape() {
        let event: FormEvent =
            serde_json::from_str(r#"{"type":"amount_edited","index":1,"amount":2500}"#).unwrap();
        assert_eq!(
            event,
            FormEvent::AmountEdited { index: 1, amount: Money::from_cents(2500) }
        );
    }
}
