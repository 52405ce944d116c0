//! Client for the id-center service: segment ids, UIDs and rule-based
//! serial numbers.

use std::sync::Arc;

use serde_json::Value;

use crate::client::{CallOptions, ClientBuilder, LesoonClient};
use crate::context::AppContext;
use crate::error::ClientError;
use crate::http::Transport;
use crate::page::Dialect;

pub const PROVIDER: &str = "lesoon-id-center-api";
pub const URL_PREFIX: &str = "/lesoon-id-center-api";
pub const MODULE_NAME: &str = "/generatorApi";

#[derive(Debug)]
pub struct IdCenterClient {
    inner: LesoonClient,
}

impl IdCenterClient {
    /// Host resolved from `PROVIDER_URLS["lesoon-id-center-api"]` or
    /// `BASE_URL` in the call context.
    pub fn new() -> Result<Self, ClientError> {
        Self::from_builder(LesoonClient::builder())
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, ClientError> {
        Self::from_builder(LesoonClient::builder().base_url(base_url))
    }

    pub fn with_transport(base_url: &str, transport: Arc<dyn Transport>) -> Result<Self, ClientError> {
        Self::from_builder(LesoonClient::builder().base_url(base_url).transport(transport))
    }

    fn from_builder(builder: ClientBuilder) -> Result<Self, ClientError> {
        let inner = builder
            .provider(PROVIDER)
            .url_prefix(URL_PREFIX)
            .module_name(MODULE_NAME)
            .dialect(Dialect::Java)
            .build()?;
        Ok(Self { inner })
    }

    pub fn client(&self) -> &LesoonClient {
        &self.inner
    }

    fn fetch(&self, ctx: &dyn AppContext, rule: &str, options: CallOptions) -> Result<Value, ClientError> {
        self.inner.get(ctx, rule, options)?.into_result()
    }

    /// Next auto-increment id for `biz_type`.
    pub fn segment_id(&self, ctx: &dyn AppContext, biz_type: &str) -> Result<Value, ClientError> {
        self.fetch(ctx, "/segment/id", CallOptions::new().param("bizType", biz_type))
    }

    pub fn batch_segment_ids(&self, ctx: &dyn AppContext, biz_type: &str, count: u32) -> Result<Value, ClientError> {
        let options = CallOptions::new().param("bizType", biz_type).param("count", count);
        self.fetch(ctx, "/batch/segment/id", options)
    }

    pub fn uid(&self, ctx: &dyn AppContext) -> Result<Value, ClientError> {
        self.fetch(ctx, "/uid", CallOptions::new())
    }

    pub fn batch_uids(&self, ctx: &dyn AppContext, count: u32) -> Result<Value, ClientError> {
        self.fetch(ctx, "/batch/uid", CallOptions::new().param("count", count))
    }

    /// Serial number (e.g. an order number) from a company's coding rule.
    pub fn serial_no(
        &self,
        ctx: &dyn AppContext,
        company_id: &str,
        code_rule_no: &str,
        dynamic_value: Option<&str>,
    ) -> Result<Value, ClientError> {
        let options = CallOptions::new()
            .param("companyId", company_id)
            .param("codeRuleNo", code_rule_no)
            .param_opt("dynamicValue", dynamic_value);
        self.fetch(ctx, "/code/no", options)
    }

    pub fn batch_serial_nos(
        &self,
        ctx: &dyn AppContext,
        company_id: &str,
        code_rule_no: &str,
        num: u32,
        dynamic_value: Option<&str>,
    ) -> Result<Value, ClientError> {
        let options = CallOptions::new()
            .param("companyId", company_id)
            .param("codeRuleNo", code_rule_no)
            .param("num", num)
            .param_opt("dynamicValue", dynamic_value);
        self.fetch(ctx, "/batch/code/no", options)
    }
}
