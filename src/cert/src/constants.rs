pub const DEFAULT_TLS_CERT: &str = "/etc/lbcf/cert/tls.cert";
pub const DEFAULT_TLS_KEY: &str = "/etc/lbcf/cert/tls.key";
pub const DEFAULT_WEBHOOK_SERVICE_HOST: &str = "lbcf-webhook-service.kube-system.svc";
