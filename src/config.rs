use std::convert::TryInto;
use std::ffi::OsStr;
use std::fs::File;

use justconfig::item::ValueExtractor;
use justconfig::processors::Trim;
use justconfig::sources::env::Env;
use justconfig::sources::text::ConfigText;
use justconfig::ConfPath;
use justconfig::Config;

use crate::config_processors::Dequote;
use crate::itemknn::similarity::BackendKind;

// Set some default values
const DEFAULT_NUM_ITEMS_TO_RECOMMEND: usize = 6;
const DEFAULT_MIN_PERSONALIZED_RESULTS: usize = 3;
const DEFAULT_MIN_SIMILARITY: f64 = 0.0;
const DEFAULT_POPULARITY_RANK_LENGTH: usize = 100;

pub struct AppConfig {
    pub server: ServerConfig,
    pub log: LogConfig,
    pub data: DataConfig,
    pub model: ModelConfig,
}

pub struct ServerConfig {
    pub host: String,
    pub port: usize,
    pub num_workers: usize,
}

pub struct LogConfig {
    pub level: String,
}

pub struct DataConfig {
    pub ratings_path: String,
    pub purchases_path: String,
}

pub struct ModelConfig {
    pub similarity_backend: BackendKind,
    pub min_similarity: f64,
    pub num_items_to_recommend: usize,
    pub min_personalized_results: usize,
    pub popularity_rank_length: usize,
}

impl AppConfig {
    pub fn new(config_path: String) -> AppConfig {
        // Initialize config object
        let mut conf = Config::default();

        // Check if there is a config file
        if let Ok(config_file) = File::open(&config_path) {
            let config_text = ConfigText::new(config_file, &config_path)
                .expect("Loading configuration file failed.");
            conf.add_source(config_text);
        }

        // Define config params from environment variables
        let config_env = Env::new(&[
            (
                ConfPath::from(&["data", "ratings_path"]),
                OsStr::new("RATINGS_DATA"),
            ),
            (
                ConfPath::from(&["data", "purchases_path"]),
                OsStr::new("PURCHASES_DATA"),
            ),
            (
                ConfPath::from(&["server", "num_workers"]),
                OsStr::new("NUM_WORKERS"),
            ),
        ]);
        conf.add_source(config_env);

        // Parse into custom config struct
        AppConfig::parse(conf)
    }

    fn parse(conf: justconfig::Config) -> AppConfig {
        AppConfig {
            server: ServerConfig::parse(&conf, ConfPath::from(&["server"])),
            log: LogConfig::parse(&conf, ConfPath::from(&["log"])),
            data: DataConfig::parse(&conf, ConfPath::from(&["data"])),
            model: ModelConfig::parse(&conf, ConfPath::from(&["model"])),
        }
    }
}

impl ServerConfig {
    fn parse(conf: &Config, path: ConfPath) -> ServerConfig {
        ServerConfig {
            host: conf
                .get(path.push("host"))
                .dequote()
                .value()
                .unwrap_or_else(|_| String::from("0.0.0.0")),
            port: conf.get(path.push("port")).trim().value().unwrap_or(8080),
            num_workers: conf
                .get(path.push("num_workers"))
                .trim()
                .value()
                // Detect number of CPUs
                .unwrap_or_else(|_| sys_info::cpu_num().unwrap_or_default().try_into().unwrap()),
        }
    }
}

impl LogConfig {
    fn parse(conf: &Config, path: ConfPath) -> LogConfig {
        LogConfig {
            level: conf
                .get(path.push("level"))
                .dequote()
                .value()
                .unwrap_or_else(|_| String::from("info")),
        }
    }
}

impl DataConfig {
    fn parse(conf: &Config, path: ConfPath) -> DataConfig {
        DataConfig {
            ratings_path: conf
                .get(path.push("ratings_path"))
                .dequote()
                .value()
                .unwrap(),
            purchases_path: conf
                .get(path.push("purchases_path"))
                .dequote()
                .value()
                .unwrap(),
        }
    }
}

impl ModelConfig {
    fn parse(conf: &Config, path: ConfPath) -> ModelConfig {
        let backend_name: String = conf
            .get(path.push("similarity_backend"))
            .dequote()
            .value()
            .unwrap_or_else(|_| String::from("auto"));

        ModelConfig {
            similarity_backend: BackendKind::from_name(&backend_name),
            min_similarity: conf
                .get(path.push("min_similarity"))
                .trim()
                .value()
                .unwrap_or(DEFAULT_MIN_SIMILARITY),
            num_items_to_recommend: conf
                .get(path.push("num_items_to_recommend"))
                .trim()
                .value()
                .unwrap_or(DEFAULT_NUM_ITEMS_TO_RECOMMEND),
            min_personalized_results: conf
                .get(path.push("min_personalized_results"))
                .trim()
                .value()
                .unwrap_or(DEFAULT_MIN_PERSONALIZED_RESULTS),
            popularity_rank_length: conf
                .get(path.push("popularity_rank_length"))
                .trim()
                .value()
                .unwrap_or(DEFAULT_POPULARITY_RANK_LENGTH),
        }
    }
}
