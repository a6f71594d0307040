use chrono::NaiveDateTime;
use serde::Deserialize;

/// Business domain of a contract. Production contracts (selling surplus
/// back to the grid) are never resolved as the working contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContractDomain {
    Electricity,
    ElectricityTransfer,
    ElectricityProduction,
    #[serde(other)]
    Unknown,
}

/// The metered physical location a contract is billed against.
/// Addressable by the short technical id or the 18-digit GSRN.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliverySite {
    pub id: u64,
    #[serde(default)]
    pub gsrn: Option<String>,
}

/// One priced component of a product, e.g. the monthly base fee or the
/// per-kWh energy price. Prices are in the unit the portal displays them
/// in: euros for base prices, ct/kWh for unit prices.
#[derive(Debug, Clone, Deserialize)]
pub struct Component {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub is_base_price: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub components: Vec<Component>,
}

impl Product {
    /// Component carrying the base price, if the product has one.
    pub fn base_price_component(&self) -> Option<&Component> {
        self.components.iter().find(|c| c.is_base_price)
    }

    pub fn component_named(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }
}

/// A contract as returned by the contract-list endpoint. Immutable once
/// fetched; a fresh fetch replaces the whole set.
#[derive(Debug, Clone, Deserialize)]
pub struct Contract {
    pub id: u64,
    pub domain: ContractDomain,
    #[serde(default)]
    pub start_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub end_date: Option<NaiveDateTime>,
    pub delivery_site: DeliverySite,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl Contract {
    /// A contract is active iff it has not ended and it is not a
    /// production contract.
    pub fn is_active(&self, now: NaiveDateTime) -> bool {
        if self.domain == ContractDomain::ElectricityProduction {
            return false;
        }
        match self.end_date {
            None => true,
            Some(end) => end >= now,
        }
    }

    /// The product billed for consumed energy (anything that is not a
    /// transfer product).
    pub fn energy_product(&self) -> Option<&Product> {
        self.products
            .iter()
            .find(|p| !product_type_is_transfer(p.product_type.as_deref()))
    }

    /// The grid-transfer product, present on transfer contracts.
    pub fn transfer_product(&self) -> Option<&Product> {
        self.products
            .iter()
            .find(|p| product_type_is_transfer(p.product_type.as_deref()))
    }
}

fn product_type_is_transfer(product_type: Option<&str>) -> bool {
    product_type
        .map(|t| t.to_ascii_lowercase().contains("transfer"))
        .unwrap_or(false)
}

/// Response body of the contract-list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractListResponse {
    #[serde(default)]
    pub contracts: Vec<Contract>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn parses_contract_list() {
        let json = r#"{
            "contracts": [{
                "id": 1234567,
                "domain": "electricity",
                "start_date": "2023-01-01T00:00:00",
                "end_date": null,
                "delivery_site": {"id": 100, "gsrn": "643001234567890123"},
                "products": [{
                    "product_type": "energy",
                    "components": [
                        {"name": "Perusmaksu", "price": 4.6, "is_base_price": true},
                        {"name": "Energia", "price": 7.89, "is_base_price": false}
                    ]
                }],
                "unknown_field": {"ignored": true}
            }]
        }"#;

        let response: ContractListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.contracts.len(), 1);
        let contract = &response.contracts[0];
        assert_eq!(contract.domain, ContractDomain::Electricity);
        assert_eq!(contract.delivery_site.id, 100);
        let product = contract.energy_product().unwrap();
        assert_eq!(product.base_price_component().unwrap().price, 4.6);
        assert_eq!(product.component_named("Energia").unwrap().price, 7.89);
    }

    #[test]
    fn unknown_domain_deserializes() {
        let contract: Contract = serde_json::from_str(
            r#"{"id": 1, "domain": "district-heating", "delivery_site": {"id": 5}}"#,
        )
        .unwrap();
        assert_eq!(contract.domain, ContractDomain::Unknown);
    }

    #[test]
    fn production_contract_is_never_active() {
        let contract: Contract = serde_json::from_str(
            r#"{"id": 2, "domain": "electricity-production", "delivery_site": {"id": 6}}"#,
        )
        .unwrap();
        assert!(!contract.is_active(at(2023, 6, 1)));
    }

    #[test]
    fn ended_contract_is_inactive() {
        let mut contract: Contract = serde_json::from_str(
            r#"{"id": 3, "domain": "electricity", "delivery_site": {"id": 7}}"#,
        )
        .unwrap();
        assert!(contract.is_active(at(2023, 6, 1)));
        contract.end_date = Some(at(2023, 5, 1));
        assert!(!contract.is_active(at(2023, 6, 1)));
    }

    #[test]
    fn transfer_product_is_found_by_type() {
        let contract: Contract = serde_json::from_str(
            r#"{
                "id": 4,
                "domain": "electricity-transfer",
                "delivery_site": {"id": 8},
                "products": [{"product_type": "electricity-transfer", "components": []}]
            }"#,
        )
        .unwrap();
        assert!(contract.transfer_product().is_some());
        assert!(contract.energy_product().is_none());
    }
}
