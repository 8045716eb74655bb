//! Order lifecycle commands
//!
//! Every command runs its role gate first, then loads and mutates the
//! order inside one storage write transaction: mutation, history append
//! and persistence commit together or not at all. Fanout happens after a
//! successful commit, so subscribers never observe a transition that was
//! rolled back (at-least-once, a commit followed by a crash before
//! publish is possible).
//!
//! The wallet charge on delivery is deliberately NOT part of the order
//! transaction. Delivery confirmation is not revocable, so a wallet
//! failure is logged and reconciled out-of-band instead of rolling the
//! order back.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::message::{FanoutEvent, RoomKey};
use shared::models::{ItemKind, Location, ModificationEntry, Order, OrderItem, OrderStatus};
use std::sync::Arc;

use crate::auth::{Principal, Role};
use crate::directory::{BranchDirectory, PartnerDirectory, ProductCatalog};
use crate::dispatch::AssignmentSelector;
use crate::fanout::EventFanout;
use crate::orders::modification::{self, ModificationOutcome, ProposedItem};
use crate::storage::CoreStorage;
use crate::utils::now_millis;
use crate::wallet::WalletLedger;

/// One requested line at order creation; the product is resolved
/// against the catalog before the order is persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: String,
    pub count: u32,
    /// Required for loose products
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub branch_id: String,
    pub items: Vec<NewOrderItem>,
    /// Customer asked for delivery; honored only if the branch can
    /// actually deliver right now
    pub delivery_requested: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_location: Option<Location>,
}

pub struct OrderManager {
    storage: Arc<CoreStorage>,
    fanout: Arc<dyn EventFanout>,
    catalog: Arc<dyn ProductCatalog>,
    branches: Arc<dyn BranchDirectory>,
    partners: Arc<dyn PartnerDirectory>,
    selector: Arc<AssignmentSelector>,
    ledger: Arc<WalletLedger>,
}

impl OrderManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        storage: Arc<CoreStorage>,
        fanout: Arc<dyn EventFanout>,
        catalog: Arc<dyn ProductCatalog>,
        branches: Arc<dyn BranchDirectory>,
        partners: Arc<dyn PartnerDirectory>,
        selector: Arc<AssignmentSelector>,
        ledger: Arc<WalletLedger>,
    ) -> Self {
        Self {
            storage,
            fanout,
            catalog,
            branches,
            partners,
            selector,
            ledger,
        }
    }

    /// Load an order (read-only)
    pub fn get_order(&self, order_id: &str) -> AppResult<Order> {
        Ok(self.storage.get_order(order_id)?)
    }

    /// Create an order for a customer
    ///
    /// The canonical flow: the order lands directly in `accepted`, with
    /// the history recording both `placed` and `accepted`. Products are
    /// resolved against the catalog and snapshotted onto the items;
    /// `delivery_enabled` is a creation-time snapshot of branch
    /// capability and partner availability.
    pub async fn create_order(
        &self,
        principal: &Principal,
        request: CreateOrderRequest,
    ) -> AppResult<Order> {
        principal.require_role(Role::Customer)?;

        let branch = self.branches.find_by_id(&request.branch_id).await?;
        if request.items.is_empty() {
            return Err(AppError::with_message(
                ErrorCode::OrderEmpty,
                "order must contain at least one item",
            ));
        }

        let mut items = Vec::with_capacity(request.items.len());
        for requested in &request.items {
            if requested.count == 0 {
                return Err(AppError::validation(format!(
                    "item {} must have a count of at least 1",
                    requested.product_id
                ))
                .with_detail("product_id", requested.product_id.as_str()));
            }
            let product = self.catalog.find_by_id(&requested.product_id).await?;
            if product.disabled {
                return Err(AppError::with_message(
                    ErrorCode::ProductDisabled,
                    format!("product {} is currently unavailable", product.name),
                )
                .with_detail("product_id", product.id.as_str()));
            }
            let kind = if product.is_loose {
                let quantity = match requested.quantity {
                    Some(q) if q > Decimal::ZERO => q,
                    _ => {
                        return Err(AppError::with_message(
                            ErrorCode::LooseQuantityRequired,
                            format!("{} requires a positive quantity", product.name),
                        )
                        .with_detail("product_id", product.id.as_str()));
                    }
                };
                ItemKind::Loose {
                    count: requested.count,
                    quantity,
                    unit: product.unit.clone(),
                }
            } else {
                ItemKind::Packed {
                    count: requested.count,
                }
            };
            items.push(OrderItem {
                product_id: product.id,
                name: product.name,
                unit_price: product.price,
                kind,
            });
        }

        let delivery_enabled = request.delivery_requested
            && self
                .selector
                .is_delivery_available(&request.branch_id)
                .await?;

        let now = now_millis();
        let order = {
            let txn = self.storage.begin_write()?;
            let sequence = self.storage.next_order_sequence(&txn)?;
            let mut order = Order {
                id: uuid::Uuid::new_v4().to_string(),
                order_number: format!("ORD-{:06}", sequence),
                sequence,
                customer_id: principal.subject_id.clone(),
                branch_id: request.branch_id.clone(),
                delivery_partner_id: None,
                items,
                status: OrderStatus::Placed,
                status_history: Vec::new(),
                total_price: Decimal::ZERO,
                delivery_enabled,
                modification_history: Vec::new(),
                manually_collected: false,
                delivery_location: request.delivery_location.clone(),
                pickup_location: branch.location.clone(),
                created_at: now,
                updated_at: now,
            };
            order.total_price = order.recompute_total();
            // Both history entries are synthesized: the branch accepts
            // implicitly at creation. The placed-then-accept flow lives
            // on only through the deprecated accept_order entry point.
            order.push_status(OrderStatus::Placed, now);
            order.push_status(OrderStatus::Accepted, now);
            self.storage.store_order(&txn, &order)?;
            txn.commit().map_err(crate::storage::StorageError::from)?;
            order
        };

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            branch_id = %order.branch_id,
            total = %order.total_price,
            delivery = order.delivery_enabled,
            "Order created"
        );

        let created = FanoutEvent::OrderCreated {
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            branch_id: order.branch_id.clone(),
            customer_id: order.customer_id.clone(),
            total_price: order.total_price,
            delivery_enabled: order.delivery_enabled,
        };
        self.fanout
            .publish(RoomKey::Branch(order.branch_id.clone()), created.clone());
        self.fanout
            .publish(RoomKey::Customer(order.customer_id.clone()), created);
        self.publish_status(&order);

        Ok(order)
    }

    /// Accept a placed order
    ///
    /// Deprecated entry point kept for clients of the old
    /// customer-places/branch-accepts flow; `create_order` already lands
    /// orders in `accepted`.
    pub async fn accept_order(&self, principal: &Principal, order_id: &str) -> AppResult<Order> {
        principal.require_role(Role::Branch)?;
        let order = self
            .transition(order_id, |order| {
                principal.require_subject(&order.branch_id)?;
                require_status(order, &[OrderStatus::Placed])?;
                Ok(OrderStatus::Accepted)
            })
            .await?;
        self.publish_status(&order);
        Ok(order)
    }

    /// Apply a branch's item changes to an accepted order
    ///
    /// Validation is all-or-nothing; a no-op proposal returns
    /// successfully without persisting anything. Removed products are
    /// reported to the catalog disable hook best-effort after commit.
    pub async fn modify_order(
        &self,
        principal: &Principal,
        order_id: &str,
        proposed_items: &[ProposedItem],
    ) -> AppResult<(Order, ModificationOutcome)> {
        principal.require_role(Role::Branch)?;

        let now = now_millis();
        let (order, outcome) = {
            let txn = self.storage.begin_write()?;
            let mut order = self.storage.get_order_txn(&txn, order_id)?;
            principal.require_subject(&order.branch_id)?;
            require_status(&order, &[OrderStatus::Accepted])?;

            let outcome = modification::validate(&order.items, proposed_items)?;
            if outcome.is_noop() {
                drop(txn);
                return Ok((order, outcome));
            }

            order.items = outcome.updated_items.clone();
            order.total_price = outcome.new_total;
            order.modification_history.push(ModificationEntry {
                modified_by: principal.subject_id.clone(),
                changes: outcome.change_descriptions.clone(),
                timestamp: now,
            });
            order.updated_at = now;
            self.storage.store_order(&txn, &order)?;
            txn.commit().map_err(crate::storage::StorageError::from)?;
            (order, outcome)
        };

        tracing::info!(
            order_id = %order.id,
            changes = outcome.change_descriptions.len(),
            new_total = %order.total_price,
            "Order modified"
        );

        // Omission during packing means out-of-stock; disable the
        // products for future orders. Best-effort, never fails the
        // modification.
        if !outcome.removed_product_ids.is_empty() {
            if let Err(err) = self
                .catalog
                .disable(
                    &outcome.removed_product_ids,
                    &order.branch_id,
                    "removed during packing",
                )
                .await
            {
                tracing::warn!(
                    order_id = %order.id,
                    error = %err,
                    "Product disable after modification failed"
                );
            }
        }

        self.fanout.publish(
            RoomKey::Customer(order.customer_id.clone()),
            FanoutEvent::OrderModified {
                order_id: order.id.clone(),
                changes: outcome.change_descriptions.clone(),
                new_total: order.total_price,
            },
        );

        Ok((order, outcome))
    }

    /// Mark an accepted order as packed
    ///
    /// Delivery orders are announced to every partner of the branch;
    /// pickup orders notify the customer to come collect.
    pub async fn mark_packed(&self, principal: &Principal, order_id: &str) -> AppResult<Order> {
        principal.require_role(Role::Branch)?;
        let order = self
            .transition(order_id, |order| {
                principal.require_subject(&order.branch_id)?;
                require_status(order, &[OrderStatus::Accepted])?;
                Ok(OrderStatus::Packed)
            })
            .await?;
        self.publish_status(&order);

        if order.delivery_enabled {
            let event = FanoutEvent::ReadyForAssignment {
                order_id: order.id.clone(),
                order_number: order.order_number.clone(),
                branch_id: order.branch_id.clone(),
            };
            match self.partners.find_by_branch(&order.branch_id).await {
                Ok(branch_partners) => {
                    for partner in branch_partners {
                        self.fanout
                            .publish(RoomKey::Partner(partner.id), event.clone());
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        order_id = %order.id,
                        error = %err,
                        "Partner lookup for assignment broadcast failed"
                    );
                }
            }
        } else {
            self.fanout.publish(
                RoomKey::Customer(order.customer_id.clone()),
                FanoutEvent::ReadyForPickup {
                    order_id: order.id.clone(),
                    order_number: order.order_number.clone(),
                },
            );
        }

        Ok(order)
    }

    /// Assign a delivery partner to a packed delivery order
    pub async fn assign_partner(
        &self,
        principal: &Principal,
        order_id: &str,
        partner_id: &str,
    ) -> AppResult<Order> {
        principal.require_role(Role::Branch)?;

        // Partner eligibility is checked before the transaction; the
        // partner directory is an external collaborator and cannot join
        // the order transaction anyway.
        let partner = self.partners.find_by_id(partner_id).await?;

        let order = self
            .transition(order_id, |order| {
                principal.require_subject(&order.branch_id)?;
                require_status(order, &[OrderStatus::Packed])?;
                if !order.delivery_enabled {
                    return Err(AppError::with_message(
                        ErrorCode::DeliveryNotEnabled,
                        "order was created for self-pickup",
                    ));
                }
                if partner.branch_id != order.branch_id || !partner.is_eligible() {
                    return Err(AppError::with_message(
                        ErrorCode::PartnerNotAvailable,
                        format!("partner {} is not available for this branch", partner.name),
                    )
                    .with_detail("partner_id", partner.id.as_str()));
                }
                order.delivery_partner_id = Some(partner.id.clone());
                Ok(OrderStatus::Assigned)
            })
            .await?;

        if let Err(err) = self.partners.add_current_order(partner_id, &order.id).await {
            tracing::warn!(
                order_id = %order.id,
                partner_id = %partner_id,
                error = %err,
                "Recording assignment on partner failed"
            );
        }

        tracing::info!(
            order_id = %order.id,
            partner_id = %partner_id,
            "Partner assigned"
        );

        let event = FanoutEvent::OrderAssigned {
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            partner_id: partner_id.to_string(),
        };
        self.fanout
            .publish(RoomKey::Branch(order.branch_id.clone()), event.clone());
        self.fanout
            .publish(RoomKey::Customer(order.customer_id.clone()), event.clone());
        self.fanout
            .publish(RoomKey::Partner(partner_id.to_string()), event);
        self.publish_status(&order);

        Ok(order)
    }

    /// Partner-driven status progression
    ///
    /// Only `assigned -> {arriving, delivered, cancelled}` and
    /// `arriving -> delivered` are legal here. Delivery settles the
    /// platform charge and releases the partner.
    pub async fn update_status(
        &self,
        principal: &Principal,
        order_id: &str,
        to: OrderStatus,
    ) -> AppResult<Order> {
        principal.require_role(Role::DeliveryPartner)?;

        let order = self
            .transition(order_id, |order| {
                let assigned = order.delivery_partner_id.as_deref().ok_or_else(|| {
                    AppError::with_message(
                        ErrorCode::PartnerNotAssigned,
                        "no delivery partner is assigned to this order",
                    )
                })?;
                principal.require_subject(assigned)?;

                let legal = match order.status {
                    OrderStatus::Assigned => matches!(
                        to,
                        OrderStatus::Arriving | OrderStatus::Delivered | OrderStatus::Cancelled
                    ),
                    OrderStatus::Arriving => to == OrderStatus::Delivered,
                    _ => false,
                };
                if !legal {
                    return Err(AppError::state_conflict(
                        "assigned or arriving",
                        order.status.as_str(),
                    )
                    .with_detail("requested_status", to.as_str()));
                }
                Ok(to)
            })
            .await?;
        self.publish_status(&order);

        match order.status {
            OrderStatus::Delivered => {
                self.settle_delivery(&order);
                self.release_partner(&order).await;
            }
            OrderStatus::Cancelled => {
                self.release_partner(&order).await;
            }
            _ => {}
        }

        Ok(order)
    }

    /// Cancel an order that has not yet been handed to a partner
    pub async fn cancel_order(&self, principal: &Principal, order_id: &str) -> AppResult<Order> {
        principal.require_role(Role::Branch)?;
        let order = self
            .transition(order_id, |order| {
                principal.require_subject(&order.branch_id)?;
                require_status(
                    order,
                    &[OrderStatus::Placed, OrderStatus::Accepted, OrderStatus::Packed],
                )?;
                Ok(OrderStatus::Cancelled)
            })
            .await?;

        tracing::info!(order_id = %order.id, "Order cancelled");
        self.publish_status(&order);
        Ok(order)
    }

    /// Customer confirms collection of a packed pickup order
    pub async fn mark_collected(&self, principal: &Principal, order_id: &str) -> AppResult<Order> {
        principal.require_role(Role::Customer)?;
        let order = self
            .transition(order_id, |order| {
                principal.require_subject(&order.customer_id)?;
                if order.delivery_enabled {
                    return Err(AppError::with_message(
                        ErrorCode::DeliveryNotEnabled,
                        "delivery orders are confirmed by the delivery partner",
                    ));
                }
                if order.manually_collected {
                    return Err(AppError::with_message(
                        ErrorCode::OrderAlreadyCollected,
                        "order was already marked as collected",
                    ));
                }
                require_status(order, &[OrderStatus::Packed])?;
                order.manually_collected = true;
                Ok(OrderStatus::Delivered)
            })
            .await?;

        self.publish_status(&order);
        self.settle_delivery(&order);
        Ok(order)
    }

    /// Run one status transition as a single atomic unit
    ///
    /// The mutator may adjust other order fields and returns the target
    /// status; any error aborts the transaction with nothing applied.
    async fn transition<F>(&self, order_id: &str, mutate: F) -> AppResult<Order>
    where
        F: FnOnce(&mut Order) -> AppResult<OrderStatus>,
    {
        let now = now_millis();
        let txn = self.storage.begin_write()?;
        let mut order = self.storage.get_order_txn(&txn, order_id)?;
        let to = mutate(&mut order)?;
        order.push_status(to, now);
        self.storage.store_order(&txn, &order)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;
        Ok(order)
    }

    fn publish_status(&self, order: &Order) {
        self.fanout.publish(
            RoomKey::Order(order.id.clone()),
            FanoutEvent::OrderStatusUpdated {
                order_id: order.id.clone(),
                order_number: order.order_number.clone(),
                status: order.status,
                timestamp: order.updated_at,
            },
        );
    }

    /// Apply the platform charge for a delivered order
    ///
    /// Best-effort by design: delivery confirmation is not revocable, so
    /// a wallet failure is logged for out-of-band reconciliation instead
    /// of rolling back the order.
    fn settle_delivery(&self, order: &Order) {
        if let Err(err) = self
            .ledger
            .apply_charge(&order.branch_id, &order.id, order.total_price)
        {
            tracing::error!(
                order_id = %order.id,
                branch_id = %order.branch_id,
                error = %err,
                "Platform charge for delivered order failed, requires reconciliation"
            );
        }
    }

    async fn release_partner(&self, order: &Order) {
        let Some(partner_id) = order.delivery_partner_id.as_deref() else {
            return;
        };
        if let Err(err) = self
            .partners
            .remove_current_order(partner_id, &order.id)
            .await
        {
            tracing::warn!(
                order_id = %order.id,
                partner_id = %partner_id,
                error = %err,
                "Releasing partner after terminal transition failed"
            );
        }
    }
}

fn require_status(order: &Order, allowed: &[OrderStatus]) -> AppResult<()> {
    if allowed.contains(&order.status) {
        Ok(())
    } else {
        let required = allowed
            .iter()
            .map(|status| status.as_str())
            .collect::<Vec<_>>()
            .join(" or ");
        Err(AppError::state_conflict(required, order.status.as_str()))
    }
}
