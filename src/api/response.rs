use actix_web::HttpResponse;
use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_PAGE_LIMIT: u64 = 20;
pub const MAX_PAGE_LIMIT: u64 = 100;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u64>,
    pub timestamp: String,
}

impl Meta {
    pub fn now() -> Self {
        Self { timestamp: chrono::Utc::now().to_rfc3339(), ..Default::default() }
    }
}

/// Envelope padrão de todas as respostas `/api/v1`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub meta: Meta,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { success: true, data: Some(data), error: None, meta: Meta::now() }
    }

    pub fn paginated(data: T, pagination: &Pagination, total: u64) -> Self {
        let mut meta = Meta::now();
        meta.page = Some(pagination.page);
        meta.limit = Some(pagination.limit);
        meta.total = Some(total);
        meta.total_pages = Some(pagination.total_pages(total));
        Self { success: true, data: Some(data), error: None, meta }
    }

    pub fn failure(code: &str, message: String, details: Option<Value>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody { code: code.to_string(), message, details }),
            meta: Meta::now(),
        }
    }
}

pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(data))
}

pub fn created<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(ApiResponse::success(data))
}

pub fn paginated<T: Serialize>(data: T, pagination: &Pagination, total: u64) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::paginated(data, pagination, total))
}

/// `?page=&limit=` cru; extraído ao lado do query específico de cada rota
#[derive(Debug, Default, serde::Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::parse(self.page.as_deref(), self.limit.as_deref())
    }
}

/// Paginação normalizada: página >= 1, limite entre 1 e 100
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    /// Valores inválidos caem nos defaults, como `parseInt` tolerante
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<i64>().ok())
            .map(|p| p.max(1) as u64)
            .unwrap_or(1);
        let limit = limit
            .and_then(|l| l.trim().parse::<i64>().ok())
            .map(|l| l.clamp(1, MAX_PAGE_LIMIT as i64) as u64)
            .unwrap_or(DEFAULT_PAGE_LIMIT);
        Self { page, limit }
    }

    /// Saturado em `i64::MAX`, o maior skip que o MongoDB aceita
    pub fn skip(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.limit)
            .min(i64::MAX as u64)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }
}

/// Serializa um documento para JSON trocando `{"$oid": ...}` pelo hex do ObjectId
pub fn document_json<T: Serialize>(doc: &T) -> Value {
    let mut value = serde_json::to_value(doc).unwrap_or(Value::Null);
    flatten_object_ids(&mut value);
    value
}

pub fn documents_json<T: Serialize>(docs: &[T]) -> Value {
    Value::Array(docs.iter().map(document_json).collect())
}

fn flatten_object_ids(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(hex)) = map.get("$oid") {
                    *value = Value::String(hex.clone());
                    return;
                }
            }
            for v in map.values_mut() {
                flatten_object_ids(v);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(flatten_object_ids),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    #[test]
    fn test_pagination_defaults() {
        let p = Pagination::parse(None, None);
        assert_eq!(p, Pagination { page: 1, limit: 20 });
        assert_eq!(p.skip(), 0);
    }

    #[test]
    fn test_pagination_clamps_values() {
        assert_eq!(Pagination::parse(Some("0"), Some("500")), Pagination { page: 1, limit: 100 });
        assert_eq!(Pagination::parse(Some("-3"), Some("0")), Pagination { page: 1, limit: 1 });
        assert_eq!(Pagination::parse(Some("abc"), Some("x")), Pagination { page: 1, limit: 20 });
        assert_eq!(Pagination::parse(Some("3"), Some("10")).skip(), 20);
    }

    #[test]
    fn test_skip_saturates_on_huge_page() {
        let p = Pagination::parse(Some("9223372036854775807"), Some("100"));
        assert_eq!(p.page, i64::MAX as u64);
        assert_eq!(p.skip(), i64::MAX as u64);

        let zero = Pagination { page: 0, limit: 20 };
        assert_eq!(zero.skip(), 0);
    }

    #[test]
    fn test_total_pages() {
        let p = Pagination::parse(Some("1"), Some("20"));
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(20), 1);
        assert_eq!(p.total_pages(21), 2);
    }

    #[test]
    fn test_document_json_renders_object_id_as_hex() {
        #[derive(Serialize)]
        struct Doc {
            #[serde(rename = "_id")]
            id: ObjectId,
            nested: Vec<ObjectId>,
            name: String,
        }

        let id = ObjectId::new();
        let json = document_json(&Doc { id, nested: vec![id], name: "IAS".into() });
        assert_eq!(json["_id"], id.to_hex());
        assert_eq!(json["nested"][0], id.to_hex());
        assert_eq!(json["name"], "IAS");
    }

    #[test]
    fn test_failure_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::<()>::failure("NOT_FOUND", "Company not found".into(), None)).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert!(body.get("data").is_none());
        assert!(body["error"].get("details").is_none());
    }
}
