//! Customer and address record derivation.
//!
//! The marketplace exposes only billing identity; the remaining profile and
//! address fields carry the fixed values the ERP expects for web-originated
//! consumers. The billing document type decides the individual-vs-
//! organization branch.

use erp::{AddressUpsert, CustomerUpsert};
use marketplace::BillingInfo;

/// Name recorded when the billing data carries none.
pub const PLACEHOLDER_NAME: &str = "CLIENTE ML";

const DEFAULT_PHONE_PREFIX: &str = "11";
const DEFAULT_PHONE: &str = "25948379";
const DEFAULT_EMAIL: &str = "09059264630@MAIL.COM.BR";
const DEFAULT_BIRTH_DATE: &str = "1993-01-01T09:52:50.638Z";

// Address placeholders; deliveries route through the marketplace's own
// logistics, so the ERP only needs a syntactically valid address.
const DEFAULT_CITY_CODE: &str = "3550308";
const DEFAULT_POSTAL_CODE: &str = "01234567";
const DEFAULT_STREET: &str = "Rua do Mercado Livre";
const DEFAULT_NEIGHBORHOOD: &str = "Centro";
const DEFAULT_STATE: &str = "SP";
const DEFAULT_STREET_NUMBER: &str = "123";

/// Derives the customer's display name from billing data.
///
/// Individuals compose first and last names; organizations use the business
/// name. Both uppercase, with a fixed placeholder when absent.
pub fn customer_name(billing: &BillingInfo) -> String {
    if billing.is_individual() {
        match (billing.field("FIRST_NAME"), billing.field("LAST_NAME")) {
            (Some(first), Some(last)) => format!("{first} {last}").to_uppercase(),
            (Some(first), None) => first.to_uppercase(),
            _ => PLACEHOLDER_NAME.to_string(),
        }
    } else {
        billing
            .field("BUSINESS_NAME")
            .map(str::to_uppercase)
            .unwrap_or_else(|| PLACEHOLDER_NAME.to_string())
    }
}

/// Builds the customer upsert payload from billing data.
pub fn customer_from_billing(billing: &BillingInfo) -> CustomerUpsert {
    let kind = if billing.is_individual() { "F" } else { "J" };

    CustomerUpsert {
        customer_code: billing.doc_number.clone(),
        customer_type_code: 1,
        branch_code: "V".to_string(),
        class_code: 53,
        class_type_code: "24".to_string(),
        marital_status_code: "1".to_string(),
        mobile_prefix: DEFAULT_PHONE_PREFIX.to_string(),
        mobile_phone: DEFAULT_PHONE.to_string(),
        commercial_prefix: DEFAULT_PHONE_PREFIX.to_string(),
        commercial_phone: DEFAULT_PHONE.to_string(),
        residential_prefix: DEFAULT_PHONE_PREFIX.to_string(),
        residential_phone: DEFAULT_PHONE.to_string(),
        nationality_code: "36".to_string(),
        profession_code: "102".to_string(),
        father_name: String::new(),
        mother_name: String::new(),
        email: DEFAULT_EMAIL.to_string(),
        kind: kind.to_string(),
        name: customer_name(billing),
        gender: "F".to_string(),
        birth_date: DEFAULT_BIRTH_DATE.to_string(),
        document: billing.doc_number.clone(),
        state_id: "0".to_string(),
        issuing_agency: "SP".to_string(),
        update_existing: true,
        reseller: false,
    }
}

/// Builds the address upsert payload for a customer code.
pub fn address_for_customer(customer_code: &str) -> AddressUpsert {
    AddressUpsert {
        customer_code: customer_code.to_string(),
        address_type: 4,
        city_code: DEFAULT_CITY_CODE.to_string(),
        postal_code: DEFAULT_POSTAL_CODE.to_string(),
        street: DEFAULT_STREET.to_string(),
        complement: "N/A".to_string(),
        neighborhood: DEFAULT_NEIGHBORHOOD.to_string(),
        state: DEFAULT_STATE.to_string(),
        street_number: DEFAULT_STREET_NUMBER.to_string(),
        property_name: "Internet".to_string(),
        state_registration: "ISENTO".to_string(),
        facade: "Internet".to_string(),
        contact: "Consumidor".to_string(),
        contact_phone: DEFAULT_PHONE.to_string(),
        contact_phone_prefix: DEFAULT_PHONE_PREFIX.to_string(),
    }
}

/// Human-readable address summary for the completion notification.
pub fn address_summary(address: &AddressUpsert) -> String {
    format!(
        "{}, {} - {}",
        address.street, address.neighborhood, address.state
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_billing(json: &str) -> BillingInfo {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn individual_name_composes_first_and_last() {
        let billing = parse_billing(
            r#"{"doc_type": "CPF", "doc_number": "09059264630",
                "additional_info": {"FIRST_NAME": "Maria", "LAST_NAME": "Silva"}}"#,
        );
        assert_eq!(customer_name(&billing), "MARIA SILVA");

        let customer = customer_from_billing(&billing);
        assert_eq!(customer.kind, "F");
        assert_eq!(customer.customer_code, "09059264630");
        assert_eq!(customer.document, "09059264630");
        assert!(customer.update_existing);
    }

    #[test]
    fn individual_with_first_name_only() {
        let billing = parse_billing(
            r#"{"doc_type": "CPF", "doc_number": "09059264630",
                "additional_info": {"FIRST_NAME": "Maria"}}"#,
        );
        assert_eq!(customer_name(&billing), "MARIA");
    }

    #[test]
    fn organization_uses_business_name() {
        let billing = parse_billing(
            r#"{"doc_type": "CNPJ", "doc_number": "03361252000134",
                "additional_info": {"BUSINESS_NAME": "Oficina Silva LTDA"}}"#,
        );
        assert_eq!(customer_name(&billing), "OFICINA SILVA LTDA");
        assert_eq!(customer_from_billing(&billing).kind, "J");
    }

    #[test]
    fn missing_name_falls_back_to_placeholder() {
        let individual = parse_billing(
            r#"{"doc_type": "CPF", "doc_number": "09059264630", "additional_info": {}}"#,
        );
        assert_eq!(customer_name(&individual), PLACEHOLDER_NAME);

        let organization = parse_billing(
            r#"{"doc_type": "CNPJ", "doc_number": "03361252000134", "additional_info": {}}"#,
        );
        assert_eq!(customer_name(&organization), PLACEHOLDER_NAME);
    }

    #[test]
    fn address_is_keyed_by_customer_code() {
        let address = address_for_customer("09059264630");
        assert_eq!(address.customer_code, "09059264630");
        assert_eq!(address.address_type, 4);
        assert_eq!(address_summary(&address), "Rua do Mercado Livre, Centro - SP");
    }
}
