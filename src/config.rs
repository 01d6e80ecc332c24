/// Process configuration, built once at startup and shared read-only.
#[derive(Clone, Debug)]
pub struct Config {
    /// Largest accepted single upload, in MB
    pub max_file_size_mb: u64,
    /// Largest accepted batch, in MB
    pub max_total_size_mb: u64,
    /// Upper bound on files per request
    pub max_files_per_request: usize,
    /// Budget for one request, shared by every file in it
    pub request_timeout_seconds: u64,
    /// CORS origins; a single "*" means any origin
    pub allowed_origins: Vec<String>,
    pub host: String,
    pub port: u16,
    /// Files processed at the same time inside one batch (1 = sequential)
    pub max_concurrent_files: usize,
    /// Where scoped upload copies are written; None uses the OS temp dir
    pub temp_dir: Option<String>,
    /// Whether to log at debug level
    pub verbose_logging: bool,
    /// Run tesseract on images and on PDFs without a text layer
    pub ocr_enabled: bool,
    /// Tesseract language code, e.g. "eng" or "deu+eng"
    pub ocr_language: String,
    // --- LLM settings ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_max_retries: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_total_size_mb: 2000,
            max_files_per_request: 30,
            request_timeout_seconds: 1800,
            allowed_origins: vec!["*".to_string()],
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_concurrent_files: 1,
            temp_dir: None,
            verbose_logging: false,
            ocr_enabled: true,
            ocr_language: "eng".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o".to_string(),
            llm_max_retries: 3,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_file_size_mb: std::env::var("MAX_FILE_SIZE_MB").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_file_size_mb),
            max_total_size_mb: std::env::var("MAX_TOTAL_SIZE_MB").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_total_size_mb),
            max_files_per_request: std::env::var("MAX_FILES_PER_REQUEST").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_files_per_request),
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_seconds),
            allowed_origins: std::env::var("ALLOWED_ORIGINS").map(|v| parse_origins(&v)).unwrap_or(default.allowed_origins),
            host: std::env::var("HOST").unwrap_or(default.host),
            port: std::env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.port),
            max_concurrent_files: std::env::var("MAX_CONCURRENT_FILES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_files),
            temp_dir: std::env::var("TEMP_DIR").ok().or(default.temp_dir),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            ocr_enabled: std::env::var("OCR_ENABLED").ok().and_then(|v| v.parse().ok()).unwrap_or(default.ocr_enabled),
            ocr_language: std::env::var("OCR_LANGUAGE").unwrap_or(default.ocr_language),
            llm_api_key: std::env::var("OPENAI_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("OPENAI_MODEL").unwrap_or(default.llm_model_name),
            llm_max_retries: std::env::var("LLM_MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.llm_max_retries),
        }
    }

    /// Byte-level admission limits derived from the MB settings.
    pub fn admission_limits(&self) -> AdmissionLimits {
        AdmissionLimits {
            max_files: self.max_files_per_request,
            max_file_size: self.max_file_size_mb.saturating_mul(BYTES_PER_MB),
            max_total_size: self.max_total_size_mb.saturating_mul(BYTES_PER_MB),
        }
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Count and size limits enforced before a batch is processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdmissionLimits {
    pub max_files: usize,
    pub max_file_size: u64,
    pub max_total_size: u64,
}

impl AdmissionLimits {
    pub fn max_file_size_mb(&self) -> u64 {
        self.max_file_size / BYTES_PER_MB
    }

    pub fn max_total_size_mb(&self) -> u64 {
        self.max_total_size / BYTES_PER_MB
    }
}

impl Default for AdmissionLimits {
    fn default() -> Self {
        Config::default().admission_limits()
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    if raw.trim() == "*" {
        return vec!["*".to_string()];
    }
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}
