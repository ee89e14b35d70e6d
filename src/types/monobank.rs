use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `GET /personal/client-info` payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientInfo {
    pub client_id: String,
    pub name: String,
    pub web_hook_url: String,
    pub permissions: String,
    pub accounts: Vec<Account>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Account {
    pub id: String,
    pub send_id: String,
    pub balance: i64,
    pub credit_limit: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub currency_code: i64,
    pub iban: String,
}

/// One element of `GET /personal/statement/...`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StatementItem {
    pub id: String,
    pub time: i64,
    pub description: String,
    pub mcc: i64,
    pub amount: i64,
    pub operation_amount: i64,
    pub currency_code: i64,
    pub balance: i64,
    pub counter_name: String,
    pub comment: String,
}

/// Client profile together with the untouched JSON it was parsed from.
#[derive(Debug, Clone)]
pub struct ClientProfile {
    pub info: ClientInfo,
    pub raw: Value,
}

impl ClientProfile {
    /// Typed extraction; accounts without an id are dropped since nothing
    /// can be fetched for them.
    pub fn from_payload(raw: Value) -> Result<Self, serde_json::Error> {
        let mut info: ClientInfo = serde_json::from_value(raw.clone())?;
        info.accounts.retain(|a| !a.id.is_empty());
        Ok(Self { info, raw })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_profile_fills_defaults_and_drops_anonymous_accounts() {
        let raw = json!({
            "clientId": "3MSaMMtczs",
            "name": "Мазепа Іван",
            "accounts": [
                {"id": "kKGVoZuHWzqVoZuH", "balance": 10000000, "creditLimit": 10000000,
                 "type": "black", "currencyCode": 980, "iban": "UA733220010000026201234567890"},
                {"balance": 5}
            ]
        });
        let profile = ClientProfile::from_payload(raw).unwrap();
        assert_eq!(profile.info.client_id, "3MSaMMtczs");
        assert_eq!(profile.info.web_hook_url, "");
        assert_eq!(profile.info.permissions, "");
        assert_eq!(profile.info.accounts.len(), 1);
        let account = &profile.info.accounts[0];
        assert_eq!(account.kind, "black");
        assert_eq!(account.send_id, "");
        assert_eq!(account.currency_code, 980);
        assert_eq!(profile.raw["accounts"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn statement_item_tolerates_missing_optional_fields() {
        let item: StatementItem = serde_json::from_value(json!({
            "id": "ZuHWzqkKGVo=",
            "time": 1554466347,
            "description": "Покупка щастя",
            "mcc": 7997,
            "amount": -95000,
            "operationAmount": -95000,
            "currencyCode": 980,
            "balance": 10050000,
            "hold": false
        }))
        .unwrap();
        assert_eq!(item.amount, -95000);
        assert_eq!(item.counter_name, "");
        assert_eq!(item.comment, "");
    }

    #[test]
    fn wrong_field_type_is_an_error() {
        let res = serde_json::from_value::<StatementItem>(json!({"id": "x", "amount": "lots"}));
        assert!(res.is_err());
    }
}
