use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Smallest currency unit (cents).
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub variation_id: Option<String>,
    pub variation_version: Option<i64>,
    #[serde(default = "default_duration")]
    pub duration_minutes: i64,
    pub price_money: Option<Money>,
}

fn default_duration() -> i64 {
    60
}

impl Service {
    /// "Free" for a zero price, "$79" or "$79.50" otherwise.
    pub fn price_label(&self) -> Option<String> {
        let money = self.price_money.as_ref()?;
        if money.amount == 0 {
            return Some("Free".to_string());
        }
        let dollars = money.amount / 100;
        let cents = money.amount % 100;
        if cents == 0 {
            Some(format!("${dollars}"))
        } else {
            Some(format!("${dollars}.{cents:02}"))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCatalog {
    pub services: Vec<Service>,
    pub location_id: Option<String>,
}

impl ServiceCatalog {
    pub fn find(&self, id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(amount: Option<i64>) -> Service {
        Service {
            id: "svc".to_string(),
            name: "Diagnostic Service Visit".to_string(),
            description: String::new(),
            variation_id: Some("VAR".to_string()),
            variation_version: Some(3),
            duration_minutes: 60,
            price_money: amount.map(|amount| Money {
                amount,
                currency: "USD".to_string(),
            }),
        }
    }

    #[test]
    fn test_price_label() {
        assert_eq!(service(Some(7900)).price_label().as_deref(), Some("$79"));
        assert_eq!(service(Some(7950)).price_label().as_deref(), Some("$79.50"));
        assert_eq!(service(Some(0)).price_label().as_deref(), Some("Free"));
        assert_eq!(service(None).price_label(), None);
    }

    #[test]
    fn test_deserialize_proxy_shape() {
        let json = r#"{"services":[{"id":"A","name":"Tune-up","description":"","variationId":"V1","variationVersion":12,"durationMinutes":90,"priceMoney":null}],"locationId":"L1"}"#;
        let catalog: ServiceCatalog = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.location_id.as_deref(), Some("L1"));
        let svc = catalog.find("A").unwrap();
        assert_eq!(svc.duration_minutes, 90);
        assert_eq!(svc.variation_version, Some(12));
        assert!(catalog.find("B").is_none());
    }
}
