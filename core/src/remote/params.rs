// Config request parameters
//
// Precedence, lowest to highest: conversion data, deep-link data (fills gaps
// only), mandatory device keys, optional push keys.

use crate::attribution::AttributionData;
use crate::device::DeviceProfile;
use serde_json::Value;

pub const KEY_ATTRIBUTION_ID: &str = "af_id";
pub const KEY_BUNDLE_ID: &str = "bundle_id";
pub const KEY_OS: &str = "os";
pub const KEY_STORE_ID: &str = "store_id";
pub const KEY_LOCALE: &str = "locale";
pub const KEY_PUSH_TOKEN: &str = "push_token";
pub const KEY_PROJECT_ID: &str = "firebase_project_id";

/// Everything besides attribution that goes into a config request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub attribution_id: String,
    pub device: DeviceProfile,
    pub push_token: Option<String>,
    pub project_id: Option<String>,
}

pub fn build_params(
    conversion_data: &AttributionData,
    deep_link_data: Option<&AttributionData>,
    context: &RequestContext,
) -> AttributionData {
    let mut params = conversion_data.clone();

    if let Some(deep_link) = deep_link_data {
        for (key, value) in deep_link {
            if !params.contains_key(key) {
                params.insert(key.clone(), value.clone());
            }
        }
    }

    let device = &context.device;
    let mandatory = [
        (KEY_ATTRIBUTION_ID, &context.attribution_id),
        (KEY_BUNDLE_ID, &device.bundle_id),
        (KEY_OS, &device.os_name),
        (KEY_STORE_ID, &device.store_id),
        (KEY_LOCALE, &device.locale),
    ];
    for (key, value) in mandatory {
        params.insert(key.to_string(), Value::String(value.clone()));
    }

    if let Some(token) = &context.push_token {
        params.insert(KEY_PUSH_TOKEN.to_string(), Value::String(token.clone()));
    }
    if let Some(project_id) = &context.project_id {
        params.insert(KEY_PROJECT_ID.to_string(), Value::String(project_id.clone()));
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn context() -> RequestContext {
        RequestContext {
            attribution_id: "af-1".to_string(),
            device: DeviceProfile {
                bundle_id: "com.example".to_string(),
                store_id: "id42".to_string(),
                os_name: "iOS".to_string(),
                locale: "en".to_string(),
            },
            push_token: None,
            project_id: None,
        }
    }

    fn map(value: Value) -> AttributionData {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_attribution_wins_over_deep_link() {
        let conversion = map(json!({"campaign": "B"}));
        let deep_link = map(json!({"campaign": "A", "deep_link_value": "promo"}));

        let params = build_params(&conversion, Some(&deep_link), &context());

        assert_eq!(params["campaign"], json!("B"));
        assert_eq!(params["deep_link_value"], json!("promo"));
    }

    #[test]
    fn test_mandatory_keys_override_attribution() {
        let conversion = map(json!({"os": "Android", "af_id": "spoofed", "af_status": "Organic"}));

        let params = build_params(&conversion, None, &context());

        assert_eq!(params["os"], json!("iOS"));
        assert_eq!(params["af_id"], json!("af-1"));
        assert_eq!(params["bundle_id"], json!("com.example"));
        assert_eq!(params["store_id"], json!("id42"));
        assert_eq!(params["locale"], json!("en"));
        assert_eq!(params["af_status"], json!("Organic"));
    }

    #[test]
    fn test_optional_keys_only_when_present() {
        let params = build_params(&AttributionData::new(), None, &context());
        assert!(!params.contains_key(KEY_PUSH_TOKEN));
        assert!(!params.contains_key(KEY_PROJECT_ID));
        assert_eq!(params.len(), 5);

        let mut ctx = context();
        ctx.push_token = Some("tok".to_string());
        ctx.project_id = Some("proj".to_string());
        let params = build_params(&AttributionData::new(), None, &ctx);
        assert_eq!(params[KEY_PUSH_TOKEN], json!("tok"));
        assert_eq!(params[KEY_PROJECT_ID], json!("proj"));
    }

    proptest! {
        #[test]
        fn prop_deep_link_never_overwrites(
            key in "[a-z_]{1,12}",
            attribution in "[a-zA-Z0-9]{0,8}",
            deep_link in "[a-zA-Z0-9]{0,8}",
        ) {
            let reserved = [KEY_ATTRIBUTION_ID, KEY_BUNDLE_ID, KEY_OS, KEY_STORE_ID, KEY_LOCALE];
            prop_assume!(!reserved.contains(&key.as_str()));

            let mut conversion = AttributionData::new();
            conversion.insert(key.clone(), Value::String(attribution.clone()));
            let mut link = AttributionData::new();
            link.insert(key.clone(), Value::String(deep_link));

            let params = build_params(&conversion, Some(&link), &context());
            prop_assert_eq!(&params[&key], &Value::String(attribution));
        }
    }
}
