//! Marketplace payload types.
//!
//! Several id fields arrive as either JSON strings or numbers depending on
//! the endpoint; they are normalized to canonical strings right here at the
//! decode boundary so nothing downstream ever sees the dynamic form.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

/// Deserializes a string-or-number id into a canonical string.
///
/// Large numeric ids must never render in scientific notation.
pub(crate) fn flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
        RawId::Float(n) => format!("{n:.0}"),
    })
}

/// Optional variant of [`flexible_id`] for fields that may be absent/null.
pub(crate) fn flexible_id_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
        RawId::Float(n) => format!("{n:.0}"),
    }))
}

/// A marketplace order with its line items and shipment reference.
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default)]
    pub date_created: String,
    #[serde(default)]
    pub order_items: Vec<OrderLine>,
    #[serde(default)]
    pub shipping: Shipping,
}

impl Order {
    /// Sum of `unit_price * quantity` over all line items.
    pub fn total_value(&self) -> f64 {
        self.order_items
            .iter()
            .map(|line| line.unit_price * f64::from(line.quantity))
            .sum()
    }

    /// The shipment id, empty when the order carries none.
    pub fn shipping_id(&self) -> &str {
        self.shipping.id.as_deref().unwrap_or("")
    }
}

/// One order line: the item sold, its unit price and quantity.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderLine {
    pub item: LineItemRef,
    pub unit_price: f64,
    pub quantity: u32,
}

/// Reference to the catalog item inside an order line.
#[derive(Debug, Clone, Deserialize)]
pub struct LineItemRef {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// Shipment reference embedded in an order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Shipping {
    #[serde(default, deserialize_with = "flexible_id_opt")]
    pub id: Option<String>,
}

/// A grouped shipment ("pack") holding one or more sub-orders.
#[derive(Debug, Clone, Deserialize)]
pub struct Pack {
    #[serde(default)]
    pub orders: Vec<PackOrder>,
}

/// Sub-order reference inside a pack.
#[derive(Debug, Clone, Deserialize)]
pub struct PackOrder {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
}

/// Catalog item with its attribute list.
#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub attributes: Vec<ItemAttribute>,
}

impl Item {
    /// The manufacturer part number, when present.
    pub fn part_number(&self) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == "MPN")
            .and_then(|attr| attr.value_name.as_deref())
    }
}

/// Name/value attribute pair on a catalog item.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemAttribute {
    pub name: String,
    #[serde(default)]
    pub value_name: Option<String>,
}

/// Billing information attached to an order.
///
/// `additional_info` arrives as either a name/value entry array or a plain
/// object depending on the API version; both decode into one flat map.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingInfo {
    #[serde(default)]
    pub doc_type: String,
    #[serde(default)]
    pub doc_number: String,
    #[serde(default, deserialize_with = "additional_info_map")]
    pub additional_info: HashMap<String, String>,
}

impl BillingInfo {
    /// Returns an additional-info field by name.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.additional_info.get(name).map(String::as_str)
    }

    /// Individual buyers carry the `CPF` document type.
    pub fn is_individual(&self) -> bool {
        self.doc_type == "CPF"
    }
}

/// Envelope returned by the billing-info endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingInfoResponse {
    pub billing_info: BillingInfo,
}

fn additional_info_map<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct NamedValue {
        name: String,
        value: String,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAdditionalInfo {
        Entries(Vec<NamedValue>),
        Map(HashMap<String, serde_json::Value>),
    }

    Ok(match Option::<RawAdditionalInfo>::deserialize(deserializer)? {
        Some(RawAdditionalInfo::Entries(entries)) => entries
            .into_iter()
            .map(|entry| (entry.name, entry.value))
            .collect(),
        Some(RawAdditionalInfo::Map(map)) => map
            .into_iter()
            .filter_map(|(name, value)| match value {
                serde_json::Value::String(s) => Some((name, s)),
                _ => None,
            })
            .collect(),
        None => HashMap::new(),
    })
}

/// Shipment status as reported by the marketplace.
#[derive(Debug, Clone, Deserialize)]
pub struct Shipment {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub substatus: Option<String>,
    #[serde(default)]
    pub lead_time: Option<LeadTime>,
}

impl Shipment {
    /// The shipment is waiting for its invoice document.
    pub fn awaits_invoice(&self) -> bool {
        self.status == "ready_to_ship" && self.substatus.as_deref() == Some("invoice_pending")
    }

    /// The shipment is buffered for a scheduled delivery window.
    pub fn is_scheduled(&self) -> bool {
        self.status == "pending" && self.substatus.as_deref() == Some("buffered")
    }

    /// Scheduled-delivery date, when the carrier reported one.
    pub fn scheduled_for(&self) -> Option<&str> {
        self.lead_time
            .as_ref()
            .and_then(|lt| lt.buffering.as_ref())
            .map(|b| b.date.as_str())
    }
}

/// Carrier lead-time block on a shipment.
#[derive(Debug, Clone, Deserialize)]
pub struct LeadTime {
    #[serde(default)]
    pub buffering: Option<Buffering>,
}

/// Scheduled-delivery buffering window.
#[derive(Debug, Clone, Deserialize)]
pub struct Buffering {
    #[serde(default)]
    pub date: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_decodes_from_string_and_number() {
        let from_string: Order =
            serde_json::from_str(r#"{"id": "2000012345678", "order_items": []}"#).unwrap();
        assert_eq!(from_string.id, "2000012345678");

        let from_number: Order =
            serde_json::from_str(r#"{"id": 2000012345678, "order_items": []}"#).unwrap();
        assert_eq!(from_number.id, "2000012345678");
    }

    #[test]
    fn float_ids_never_render_scientific_notation() {
        let pack: Pack = serde_json::from_str(r#"{"orders": [{"id": 2.000012345678e12}]}"#).unwrap();
        assert_eq!(pack.orders[0].id, "2000012345678");
    }

    #[test]
    fn order_total_and_shipping_id() {
        let order: Order = serde_json::from_str(
            r#"{
                "id": 1,
                "date_created": "2025-08-01T10:00:00.000-03:00",
                "order_items": [
                    {"item": {"id": "MLB111", "title": "Filtro"}, "unit_price": 150.0, "quantity": 2},
                    {"item": {"id": "MLB222", "title": "Vela"}, "unit_price": 25.5, "quantity": 1}
                ],
                "shipping": {"id": 44331122}
            }"#,
        )
        .unwrap();
        assert_eq!(order.total_value(), 325.5);
        assert_eq!(order.shipping_id(), "44331122");
    }

    #[test]
    fn billing_additional_info_as_object() {
        let response: BillingInfoResponse = serde_json::from_str(
            r#"{"billing_info": {"doc_type": "CPF", "doc_number": "09059264630",
                "additional_info": {"FIRST_NAME": "Maria", "LAST_NAME": "Silva"}}}"#,
        )
        .unwrap();
        let billing = response.billing_info;
        assert!(billing.is_individual());
        assert_eq!(billing.field("FIRST_NAME"), Some("Maria"));
    }

    #[test]
    fn billing_additional_info_as_entry_array() {
        let response: BillingInfoResponse = serde_json::from_str(
            r#"{"billing_info": {"doc_type": "CNPJ", "doc_number": "03361252000134",
                "additional_info": [{"name": "BUSINESS_NAME", "value": "Oficina LTDA"}]}}"#,
        )
        .unwrap();
        let billing = response.billing_info;
        assert!(!billing.is_individual());
        assert_eq!(billing.field("BUSINESS_NAME"), Some("Oficina LTDA"));
    }

    #[test]
    fn item_part_number_from_attributes() {
        let item: Item = serde_json::from_str(
            r#"{"id": "MLB111", "title": "Filtro",
                "attributes": [
                    {"name": "BRAND", "value_name": "ACME"},
                    {"name": "MPN", "value_name": "LC4477"}
                ]}"#,
        )
        .unwrap();
        assert_eq!(item.part_number(), Some("LC4477"));
    }

    #[test]
    fn shipment_status_helpers() {
        let awaiting: Shipment = serde_json::from_str(
            r#"{"status": "ready_to_ship", "substatus": "invoice_pending"}"#,
        )
        .unwrap();
        assert!(awaiting.awaits_invoice());
        assert!(!awaiting.is_scheduled());

        let scheduled: Shipment = serde_json::from_str(
            r#"{"status": "pending", "substatus": "buffered",
                "lead_time": {"buffering": {"date": "2025-08-09T12:00:00Z"}}}"#,
        )
        .unwrap();
        assert!(scheduled.is_scheduled());
        assert_eq!(scheduled.scheduled_for(), Some("2025-08-09T12:00:00Z"));
    }
}
