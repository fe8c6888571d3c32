use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use thirtyfour::extensions::cdp::ChromeDevTools;
use thirtyfour::prelude::*;
use thirtyfour::ChromeCapabilities;

const POPUP_PATH: &str = "popup/popup.html";
const POPUP_SELECTOR: &str = "#sync-button";

pub struct E2eOptions {
    pub chromedriver_url: String,
    pub extension_path: String,
    pub headless: bool,
}

pub fn run_e2e(opts: E2eOptions) -> Result<(), String> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))?;
    runtime.block_on(run_e2e_async(opts))
}

fn chrome_caps(extension_path: &Path, headless: bool) -> Result<ChromeCapabilities, String> {
    let mut caps = ChromeCapabilities::new();
    let mut args = vec![
        format!("--disable-extensions-except={}", extension_path.display()),
        format!("--load-extension={}", extension_path.display()),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
    ];
    if headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }
    for arg in &args {
        caps.add_arg(arg)
            .map_err(|e| format!("Failed to set chrome arg '{}': {}", arg, e))?;
    }
    Ok(caps)
}

async fn run_e2e_async(opts: E2eOptions) -> Result<(), String> {
    let extension_path = canonicalize_path(&opts.extension_path)?;
    let caps = chrome_caps(&extension_path, opts.headless)?;

    let driver = WebDriver::new(&opts.chromedriver_url, caps)
        .await
        .map_err(|e| format!("Failed to connect to chromedriver: {}", e))?;

    let cdp = ChromeDevTools::new(driver.handle.clone());
    tokio::time::sleep(Duration::from_secs(1)).await;

    let extension_id = match find_extension_id(&cdp).await {
        Some(id) => id,
        None => {
            driver.quit().await.ok();
            return Err("Failed to locate the extension's background worker".to_string());
        }
    };

    let popup_url = format!("chrome-extension://{}/{}", extension_id, POPUP_PATH);
    let mut errors = Vec::new();

    if let Err(e) = check_page_has_selector(&driver, &popup_url, POPUP_SELECTOR).await {
        errors.push(format!("Popup page check failed: {}", e));
    }

    if let Err(e) = check_wasm_helpers(&driver, &popup_url).await {
        errors.push(format!("Wasm helper check failed: {}", e));
    }

    driver.quit().await.ok();

    if errors.is_empty() {
        println!("✓ E2E checks passed");
        Ok(())
    } else {
        Err(format!("E2E failed:\n- {}", errors.join("\n- ")))
    }
}

async fn find_extension_id(cdp: &ChromeDevTools) -> Option<String> {
    let targets = cdp.execute_cdp("Target.getTargets").await.ok()?;
    let infos = targets.get("targetInfos")?.as_array()?;
    for info in infos {
        let target_type = info.get("type").and_then(Value::as_str).unwrap_or("");
        let url = info.get("url").and_then(Value::as_str).unwrap_or("");
        let is_background = matches!(target_type, "service_worker" | "background_page");
        if is_background && url.starts_with("chrome-extension://") {
            let id = url.trim_start_matches("chrome-extension://");
            if let Some(id) = id.split('/').next().filter(|id| !id.is_empty()) {
                return Some(id.to_string());
            }
        }
    }
    None
}

async fn check_page_has_selector(driver: &WebDriver, url: &str, selector: &str) -> WebDriverResult<()> {
    driver.goto(url).await?;
    driver.find(By::Css(selector)).await?;
    Ok(())
}

/// The popup loads the same wasm module as the content script; its helpers
/// must accept a valid payload and refuse a look-alike host.
async fn check_wasm_helpers(driver: &WebDriver, popup_url: &str) -> Result<(), String> {
    driver.goto(popup_url).await.map_err(|e| format!("Failed to open popup: {}", e))?;

    let accepted = eval_bool(
        driver,
        "return window.wasm?.validate_payload?.({version: 1, source: 'spellbook', timestamp: Date.now(), preparedSpells: ['Shield']})?.ok ?? false;",
    )
    .await
    .map_err(|e| format!("Failed to evaluate validate_payload: {}", e))?;
    if !accepted {
        return Err("Expected a valid payload to be accepted".to_string());
    }

    let wrong_host = eval_bool(
        driver,
        "return window.wasm?.is_sync_target?.('https://www.dndbeyond.com.evil.io/characters/1') ?? true;",
    )
    .await
    .map_err(|e| format!("Failed to evaluate is_sync_target: {}", e))?;
    if wrong_host {
        return Err("Expected a look-alike host to be rejected".to_string());
    }

    Ok(())
}

async fn eval_bool(driver: &WebDriver, script: &str) -> WebDriverResult<bool> {
    let result = driver.execute(script, Vec::<Value>::new()).await?;
    Ok(result.json().as_bool().unwrap_or(false))
}

fn canonicalize_path(path: &str) -> Result<PathBuf, String> {
    std::fs::canonicalize(path)
        .map_err(|e| format!("Failed to resolve '{}': {}", path, e))
}
