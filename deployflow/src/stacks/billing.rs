//! Billing alarm stack: a monthly cost budget with an email notification.

use super::StackDescriptor;
use crate::errors::{codes, ConfigurationError};
use serde::{Deserialize, Serialize};

const DEFAULT_STACK_NAME: &str = "BillingStack";

/// Budget period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeUnit {
    /// Calendar month.
    Monthly,
}

/// How spend is compared against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonOperator {
    /// Spend above the threshold.
    GreaterThan,
}

/// Which spend figure triggers the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    /// Spend already incurred.
    Actual,
}

/// Unit of the notification threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThresholdType {
    /// Percentage of the budget limit.
    Percentage,
}

/// Budget limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLimit {
    /// The amount.
    pub amount: f64,
    /// Currency unit.
    pub unit: String,
}

/// A notification with its email subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetNotification {
    /// Comparison against the threshold.
    pub comparison_operator: ComparisonOperator,
    /// Spend figure.
    pub notification_type: NotificationType,
    /// Threshold value.
    pub threshold: f64,
    /// Threshold unit.
    pub threshold_type: ThresholdType,
    /// Email address notified.
    pub email_address: String,
}

/// The budget deployed by the billing stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetDefinition {
    /// Budget period.
    pub time_unit: TimeUnit,
    /// Budget limit.
    pub limit: BudgetLimit,
    /// Notifications.
    pub notifications: Vec<BudgetNotification>,
}

/// A billing alarm that can be deployed from any stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingStack {
    stack_name: String,
    budget: BudgetDefinition,
}

impl BillingStack {
    /// Creates a billing stack alerting `notify_address` once actual monthly
    /// spend exceeds `budget_amount` USD.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is not a positive finite number or the
    /// address is blank.
    pub fn create(budget_amount: f64, notify_address: impl Into<String>) -> Result<Self, ConfigurationError> {
        let notify_address = notify_address.into();
        if !budget_amount.is_finite() || budget_amount <= 0.0 {
            return Err(ConfigurationError::new(
                codes::INVALID_BILLING,
                format!("Budget amount must be greater than zero, got {budget_amount}"),
            ));
        }
        if notify_address.trim().is_empty() {
            return Err(ConfigurationError::new(
                codes::INVALID_BILLING,
                "Notification address must not be empty",
            ));
        }

        Ok(Self {
            stack_name: DEFAULT_STACK_NAME.to_string(),
            budget: BudgetDefinition {
                time_unit: TimeUnit::Monthly,
                limit: BudgetLimit {
                    amount: budget_amount,
                    unit: "USD".to_string(),
                },
                notifications: vec![BudgetNotification {
                    comparison_operator: ComparisonOperator::GreaterThan,
                    notification_type: NotificationType::Actual,
                    threshold: 100.0,
                    threshold_type: ThresholdType::Percentage,
                    email_address: notify_address,
                }],
            },
        })
    }

    /// Sets the stack name.
    #[must_use]
    pub fn with_stack_name(mut self, stack_name: impl Into<String>) -> Self {
        self.stack_name = stack_name.into();
        self
    }

    /// The budget this stack deploys.
    #[must_use]
    pub const fn budget(&self) -> &BudgetDefinition {
        &self.budget
    }

    /// The budget amount.
    #[must_use]
    pub const fn budget_amount(&self) -> f64 {
        self.budget.limit.amount
    }
}

impl StackDescriptor for BillingStack {
    fn stack_name(&self) -> &str {
        &self.stack_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_valid() {
        let billing = BillingStack::create(5.0, "a@b.com").unwrap();
        assert_eq!(billing.stack_name(), "BillingStack");
        assert!((billing.budget_amount() - 5.0).abs() < f64::EPSILON);

        let notification = &billing.budget().notifications[0];
        assert_eq!(notification.email_address, "a@b.com");
        assert_eq!(notification.threshold_type, ThresholdType::Percentage);
        assert_eq!(billing.budget().time_unit, TimeUnit::Monthly);
    }

    #[test]
    fn test_zero_amount_rejected() {
        let err = BillingStack::create(0.0, "a@b.com").unwrap_err();
        assert_eq!(err.error_info.code, codes::INVALID_BILLING);
    }

    #[test]
    fn test_negative_and_nan_amount_rejected() {
        assert!(BillingStack::create(-1.0, "a@b.com").is_err());
        assert!(BillingStack::create(f64::NAN, "a@b.com").is_err());
        assert!(BillingStack::create(f64::INFINITY, "a@b.com").is_err());
    }

    #[test]
    fn test_blank_address_rejected() {
        let err = BillingStack::create(5.0, "  ").unwrap_err();
        assert!(err.message.contains("address"));
    }

    #[test]
    fn test_custom_stack_name() {
        let billing = BillingStack::create(10.0, "ops@example.com")
            .unwrap()
            .with_stack_name("BillingStackProd");
        assert_eq!(billing.stack_name(), "BillingStackProd");
    }

    #[test]
    fn test_budget_serialization() {
        let billing = BillingStack::create(5.0, "a@b.com").unwrap();
        let json = serde_json::to_value(billing.budget()).unwrap();
        assert_eq!(json["time_unit"], "MONTHLY");
        assert_eq!(json["notifications"][0]["comparison_operator"], "GREATER_THAN");
    }
}
