use std::fs;

pub fn get() -> Result<String, String> {
    let config_path = match std::env::var("OD_CONFIG_PATH") {
        Ok(path) => path,
        Err(_) => "config.yml".to_owned(),
    };

    if fs::metadata(&config_path).is_err() {
        return Err(format!(
            "Config file '{config_path}' (from OD_CONFIG_PATH or the current directory) must exist"
        ));
    }

    Ok(config_path)
}
