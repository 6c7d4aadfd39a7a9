//! Value objects for the order domain.

use std::fmt;
use std::str::FromStr;

use common::AggregateId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::OrderError;

/// Catalog product reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Amount in integer minor units (paise, cents).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money {
    minor: i64,
}

impl Money {
    pub fn from_minor(minor: i64) -> Self {
        Self { minor }
    }

    pub fn zero() -> Self {
        Self { minor: 0 }
    }

    pub fn minor_units(&self) -> i64 {
        self.minor
    }

    pub fn is_positive(&self) -> bool {
        self.minor > 0
    }

    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            minor: self.minor * i64::from(quantity),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minor < 0 { "-" } else { "" };
        let abs = self.minor.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            minor: self.minor + rhs.minor,
        }
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// One product line of a goods order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Money,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl LineItem {
    pub fn new(
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            price,
            quantity,
            image: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn total_price(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// Payment information as reported by the checkout flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressType {
    #[default]
    Home,
    Work,
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(rename = "type", default)]
    pub address_type: AddressType,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub pincode: String,
}

/// Provider display fields copied into a booking when it is made.
///
/// Later edits to the provider profile do not reach existing bookings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSnapshot {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub specialization: String,
    #[serde(default)]
    pub contact_info: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub profile_image: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Goods,
    Booking,
}

impl OrderType {
    fn prefix(self) -> &'static str {
        match self {
            OrderType::Goods => "OD-",
            OrderType::Booking => "GD-",
        }
    }
}

/// Customer-facing order number, e.g. `OD-9f1c...`.
///
/// Encodes the order type and the order's stream id, so it parses back to
/// the stream without a lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber {
    order_type: OrderType,
    id: AggregateId,
}

impl OrderNumber {
    pub fn new(order_type: OrderType, id: AggregateId) -> Self {
        Self { order_type, id }
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.id
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            self.order_type.prefix(),
            self.id.as_uuid().simple()
        )
    }
}

impl FromStr for OrderNumber {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OrderError::InvalidOrderNumber(s.to_string());

        let (order_type, rest) = [OrderType::Goods, OrderType::Booking]
            .into_iter()
            .find_map(|t| s.strip_prefix(t.prefix()).map(|rest| (t, rest)))
            .ok_or_else(invalid)?;

        let uuid = Uuid::try_parse(rest).map_err(|_| invalid())?;
        Ok(Self::new(order_type, AggregateId::from_uuid(uuid)))
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = OrderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OrderNumber> for String {
    fn from(number: OrderNumber) -> Self {
        number.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_display_and_arithmetic() {
        assert_eq!(Money::from_minor(1234).to_string(), "12.34");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
        assert_eq!(Money::from_minor(-250).to_string(), "-2.50");
        assert_eq!(Money::from_minor(499).multiply(3).minor_units(), 1497);

        let total: Money = [Money::from_minor(100), Money::from_minor(250)]
            .into_iter()
            .sum();
        assert_eq!(total.minor_units(), 350);
    }

    #[test]
    fn line_item_total() {
        let item = LineItem::new("SKU-1", "Rose bush", Money::from_minor(45000), 2);
        assert_eq!(item.total_price().minor_units(), 90000);
    }

    #[test]
    fn order_number_round_trips_through_string() {
        let id = AggregateId::new();
        let number = OrderNumber::new(OrderType::Booking, id);
        let text = number.to_string();

        assert!(text.starts_with("GD-"));
        assert_eq!(text.len(), 3 + 32);

        let parsed: OrderNumber = text.parse().unwrap();
        assert_eq!(parsed.aggregate_id(), id);
        assert_eq!(parsed.order_type(), OrderType::Booking);
    }

    #[test]
    fn order_number_rejects_garbage() {
        for input in ["", "OD-", "XX-1234", "OD-not-a-uuid", "OD1700000000000"] {
            assert!(matches!(
                input.parse::<OrderNumber>(),
                Err(OrderError::InvalidOrderNumber(_))
            ));
        }
    }

    #[test]
    fn shipping_address_uses_type_key() {
        let address: ShippingAddress = serde_json::from_value(serde_json::json!({
            "type": "work",
            "address": "12 MG Road",
            "city": "Pune",
            "state": "MH",
            "pincode": "411001"
        }))
        .unwrap();
        assert_eq!(address.address_type, AddressType::Work);

        let defaulted: ShippingAddress = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(defaulted.address_type, AddressType::Home);
    }
}
