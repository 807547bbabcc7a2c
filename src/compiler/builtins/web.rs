//! web.* lowering over curl.

use super::misrouted;
use crate::ast::types::{BuiltinCall, Expression};
use crate::compiler::{CompileError, Compiler, Lowered};

impl Compiler<'_> {
    pub(in crate::compiler) fn lower_web(&mut self, call: &BuiltinCall) -> Result<Lowered, CompileError> {
        match call {
            BuiltinCall::WebGet { url } => Ok(Lowered::Output(format!("curl -s {}", self.value(url)?))),
            BuiltinCall::WebPost { url, data } => self.request("POST", url, data.as_ref()),
            BuiltinCall::WebPut { url, data } => self.request("PUT", url, Some(data)),
            BuiltinCall::WebDelete { url } => Ok(Lowered::Output(format!("curl -s -X DELETE {}", self.value(url)?))),
            other => Err(misrouted("web", other)),
        }
    }

    fn request(&mut self, method: &str, url: &Expression, data: Option<&Expression>) -> Result<Lowered, CompileError> {
        let url = self.value(url)?;
        let mut command = format!("curl -s -X {} -H \"Content-Type: application/json\"", method);
        if let Some(data) = data {
            command.push_str(&format!(" -d {}", self.value(data)?));
        }
        command.push(' ');
        command.push_str(&url);
        Ok(Lowered::Output(command))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::body;

    #[test]
    fn test_get() {
        assert_eq!(
            body("let page: string = web.get(\"https://example.com\");"),
            "page=\"$(curl -s \"https://example.com\")\"\n"
        );
    }

    #[test]
    fn test_post_with_body() {
        let out = body("let payload: string = \"{}\";\nweb.post(\"https://api.example.com\", payload);");
        assert!(out.ends_with(
            "curl -s -X POST -H \"Content-Type: application/json\" -d \"${payload}\" \"https://api.example.com\" >/dev/null\n"
        ));
    }
}
