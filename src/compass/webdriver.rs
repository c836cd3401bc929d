// A minimal W3C WebDriver client, enough to drive the questionnaire with chromedriver.

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use base64::Engine;
use serde_json::json;
use serde_json::Value as JSValue;
use statement_matching::outcome::parse_compass_scores;
use statement_matching::session::{
    CompassScores, InteractionResult, QuestionBlock, QuestionnaireSession,
};
use statement_matching::{ActionCode, InteractionError};

use crate::compass::config_reader::RunConfig;
use crate::compass::*;

// The key under which element references are returned.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const POLL_INTERVAL: Duration = Duration::from_millis(250);
// Time given to the page to react after a navigation click.
const SETTLE_DELAY: Duration = Duration::from_secs(2);

const QUESTION_XPATH: &str = "//fieldset";
const CLOSE_BUTTON_XPATH: &str =
    "//button[contains(@class, 'close') or contains(@aria-label, 'Close')]";
const NEXT_PAGE_XPATH: &str = "//button[contains(text(), 'Next page')]";
const STAND_XPATH: &str = "//button[contains(text(), \"Now let's see where you stand\")]";
const SCORES_XPATH: &str = "//h2[contains(text(), 'Economic Left/Right')]";
const CHART_LINK_TEXT: &str = "Show chart in a separate window for printing";

static PROFILE_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn element_ref(id: &str) -> JSValue {
    json!({ ELEMENT_KEY: id })
}

fn element_id(v: &JSValue) -> InteractionResult<String> {
    v[ELEMENT_KEY]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| InteractionError::Protocol(format!("not an element: {}", v)))
}

fn call(request: ureq::Request, body: Option<JSValue>) -> InteractionResult<JSValue> {
    let res = match body {
        Some(b) => request.send_json(b),
        None => request.call(),
    };
    match res {
        Ok(resp) => {
            let js: JSValue = resp
                .into_json()
                .map_err(|e| InteractionError::Protocol(e.to_string()))?;
            Ok(js["value"].clone())
        }
        Err(ureq::Error::Status(code, resp)) => {
            let js: JSValue = resp.into_json().unwrap_or(JSValue::Null);
            let kind = js["value"]["error"].as_str().unwrap_or("unknown error");
            let message = js["value"]["message"].as_str().unwrap_or("");
            if kind == "no such element" {
                Err(InteractionError::ElementNotFound(message.to_string()))
            } else {
                Err(InteractionError::Protocol(format!(
                    "{} ({}): {}",
                    kind, code, message
                )))
            }
        }
        Err(e) => Err(InteractionError::Transport(e.to_string())),
    }
}

/// A browser session driven through chromedriver.
///
/// Every session runs with its own profile directory, removed when the session is closed.
pub struct WebDriverSession {
    agent: ureq::Agent,
    session_url: String,
    user_data_dir: PathBuf,
    element_timeout: Duration,
    closed: bool,
}

impl WebDriverSession {
    pub fn start(config: &RunConfig) -> InteractionResult<WebDriverSession> {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(60))
            .build();
        let user_data_dir = std::env::temp_dir().join(format!(
            "compassfill-profile-{}-{}",
            std::process::id(),
            PROFILE_COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        fs::create_dir_all(&user_data_dir)
            .map_err(|e| InteractionError::Transport(e.to_string()))?;
        info!(
            "Created temporary user data directory: {}",
            user_data_dir.display()
        );

        let mut args: Vec<String> = vec![
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            format!("--window-size={}", config.window_size()),
            format!("--user-data-dir={}", user_data_dir.display()),
        ];
        if config.headless() {
            args.push("--headless=new".to_string());
        }
        let mut chrome_options = json!({ "args": args });
        if let Some(binary) = &config.chrome_binary_path {
            chrome_options["binary"] = json!(binary);
        }
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": chrome_options
                }
            }
        });

        let driver_url = config.webdriver_url();
        let created = call(
            agent.post(&format!("{}/session", driver_url)),
            Some(capabilities),
        );
        let value = match created {
            Ok(v) => v,
            Err(e) => {
                let _ = fs::remove_dir_all(&user_data_dir);
                return Err(e);
            }
        };
        let session_id = value["sessionId"]
            .as_str()
            .ok_or_else(|| InteractionError::Protocol(format!("no session id in {}", value)))?;
        info!(
            "Chrome Version: {}",
            value["capabilities"]["browserVersion"].as_str().unwrap_or("?")
        );
        info!(
            "ChromeDriver Version: {}",
            value["capabilities"]["chrome"]["chromedriverVersion"]
                .as_str()
                .and_then(|s| s.split(' ').next())
                .unwrap_or("?")
        );

        Ok(WebDriverSession {
            agent,
            session_url: format!("{}/session/{}", driver_url, session_id),
            user_data_dir,
            element_timeout: config.element_timeout(),
            closed: false,
        })
    }

    fn post(&self, path: &str, body: JSValue) -> InteractionResult<JSValue> {
        call(
            self.agent.post(&format!("{}{}", self.session_url, path)),
            Some(body),
        )
    }

    fn get(&self, path: &str) -> InteractionResult<JSValue> {
        call(
            self.agent.get(&format!("{}{}", self.session_url, path)),
            None,
        )
    }

    fn find_elements(&self, using: &str, value: &str) -> InteractionResult<Vec<String>> {
        let found = self.post("/elements", json!({ "using": using, "value": value }))?;
        match found.as_array() {
            Some(l) => l.iter().map(element_id).collect(),
            None => Err(InteractionError::Protocol(format!(
                "expected a list of elements: {}",
                found
            ))),
        }
    }

    fn find_element_in(&self, parent: &str, using: &str, value: &str) -> InteractionResult<String> {
        let found = self.post(
            &format!("/element/{}/element", parent),
            json!({ "using": using, "value": value }),
        )?;
        element_id(&found)
    }

    /// Polls until at least one element matches.
    fn wait_for_elements(&self, using: &str, value: &str) -> InteractionResult<Vec<String>> {
        let deadline = Instant::now() + self.element_timeout;
        loop {
            match self.find_elements(using, value) {
                Ok(l) if !l.is_empty() => return Ok(l),
                Ok(_) => {}
                Err(InteractionError::ElementNotFound(_)) => {}
                Err(e) => return Err(e),
            }
            if Instant::now() >= deadline {
                return Err(InteractionError::Timeout(value.to_string()));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn wait_for_element(&self, using: &str, value: &str) -> InteractionResult<String> {
        let mut l = self.wait_for_elements(using, value)?;
        Ok(l.remove(0))
    }

    fn element_text(&self, id: &str) -> InteractionResult<String> {
        let v = self.get(&format!("/element/{}/text", id))?;
        Ok(v.as_str().unwrap_or("").to_string())
    }

    fn click(&self, id: &str) -> InteractionResult<()> {
        self.post(&format!("/element/{}/click", id), json!({}))?;
        Ok(())
    }

    fn scroll_into_view(&self, id: &str) -> InteractionResult<()> {
        self.post(
            "/execute/sync",
            json!({
                "script": "arguments[0].scrollIntoView(true);",
                "args": [element_ref(id)]
            }),
        )?;
        Ok(())
    }

    fn navigate(&self, url: &str) -> InteractionResult<()> {
        self.post("/url", json!({ "url": url }))?;
        Ok(())
    }

    fn click_close_buttons(&self) -> InteractionResult<()> {
        for button in self.find_elements("xpath", CLOSE_BUTTON_XPATH)? {
            self.click(&button)?;
            info!("Closed a pop-up or ad.");
        }
        Ok(())
    }

    /// Closes the overlays that may hide the questions. Failures are only logged.
    fn dismiss_popups(&self) {
        let res = self.click_close_buttons().and_then(|_| {
            let frames = self.find_elements("tag name", "iframe")?;
            match frames.first() {
                Some(frame) => {
                    self.post("/frame", json!({ "id": element_ref(frame) }))?;
                    let inner = self.click_close_buttons();
                    self.post("/frame", json!({ "id": JSValue::Null }))?;
                    inner
                }
                None => Ok(()),
            }
        });
        if let Err(e) = res {
            warn!("Error closing pop-up: {}", e);
        }
    }

    /// Ends the browser session. Called automatically when dropped.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = call(self.agent.delete(&self.session_url), None) {
            warn!("Error quitting driver: {}", e);
        }
        match fs::remove_dir_all(&self.user_data_dir) {
            Ok(()) => info!(
                "Cleaned up temporary directory: {}",
                self.user_data_dir.display()
            ),
            Err(e) => warn!("Error cleaning up temporary directory: {}", e),
        }
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl QuestionnaireSession for WebDriverSession {
    fn load_page(&mut self, url: &str) -> InteractionResult<()> {
        info!("Opening {}", url);
        self.navigate(url)
    }

    fn question_blocks(&mut self) -> InteractionResult<Vec<QuestionBlock>> {
        let fieldsets = self.wait_for_elements("xpath", QUESTION_XPATH)?;
        self.dismiss_popups();
        let mut blocks: Vec<QuestionBlock> = Vec::new();
        for fieldset in fieldsets {
            let text = self
                .find_element_in(&fieldset, "xpath", ".//legend")
                .and_then(|legend| self.element_text(&legend));
            match text {
                Ok(t) => blocks.push(QuestionBlock {
                    handle: fieldset,
                    text: t.trim().to_string(),
                }),
                Err(e) => error!("Error processing a question fieldset: {}", e),
            }
        }
        Ok(blocks)
    }

    fn select_option(
        &mut self,
        block: &QuestionBlock,
        action: ActionCode,
    ) -> InteractionResult<()> {
        self.scroll_into_view(&block.handle)?;
        let radio_xpath = format!(".//input[@type='radio'][@value='{}']", action.value());
        let res = self
            .find_element_in(&block.handle, "xpath", &radio_xpath)
            .and_then(|radio| self.click(&radio));
        match res {
            Ok(()) => {
                info!("Clicked radio button with value {}", action);
                Ok(())
            }
            Err(e) => {
                self.dismiss_popups();
                Err(e)
            }
        }
    }

    fn advance_page(&mut self) -> InteractionResult<()> {
        let button = self.wait_for_element("xpath", NEXT_PAGE_XPATH)?;
        self.click(&button)?;
        info!("Clicked 'Next page' button.");
        thread::sleep(SETTLE_DELAY);
        Ok(())
    }

    fn finalize_and_extract_scores(&mut self) -> InteractionResult<CompassScores> {
        let button = self.wait_for_element("xpath", STAND_XPATH)?;
        self.click(&button)?;
        info!("Clicked the 'Now let's see where you stand' button.");
        thread::sleep(SETTLE_DELAY);

        let heading = self.wait_for_element("xpath", SCORES_XPATH)?;
        let text = self.element_text(&heading)?;
        info!("Found compass values text: {}", text.trim());
        Ok(parse_compass_scores(&text))
    }

    fn export_current_view_as_document(&mut self, path: &Path) -> InteractionResult<()> {
        let link = self.wait_for_element("link text", CHART_LINK_TEXT)?;
        let href = self.get(&format!("/element/{}/attribute/href", link))?;
        let url = href
            .as_str()
            .ok_or_else(|| InteractionError::ElementNotFound("chart link href".to_string()))?;
        info!("Located the result link: {}", url);
        self.navigate(url)?;
        thread::sleep(SETTLE_DELAY);

        // A4, in centimeters.
        let printed = self.post(
            "/print",
            json!({ "page": { "width": 21.0, "height": 29.7 }, "background": true }),
        )?;
        let data = printed
            .as_str()
            .ok_or_else(|| InteractionError::Protocol("no document in print response".into()))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| InteractionError::Protocol(e.to_string()))?;
        fs::write(path, bytes).map_err(|e| InteractionError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// A chromedriver started by this program. It is stopped when dropped.
pub struct ChromeDriverProcess {
    child: Child,
}

impl ChromeDriverProcess {
    pub fn spawn(path: &str, config: &RunConfig) -> CompassResult<ChromeDriverProcess> {
        let port = config.driver_port();
        info!("Starting {} on port {}", path, port);
        let child = Command::new(path)
            .arg(format!("--port={}", port))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context(SpawningDriverSnafu { path })?;
        let process = ChromeDriverProcess { child };

        let url = config.webdriver_url();
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(5))
            .build();
        let deadline = Instant::now() + config.element_timeout();
        loop {
            match call(agent.get(&format!("{}/status", url)), None) {
                Ok(v) if v["ready"].as_bool() == Some(true) => {
                    info!("chromedriver ready at {}", url);
                    return Ok(process);
                }
                res => debug!("ChromeDriverProcess::spawn: status: {:?}", res),
            }
            ensure!(
                Instant::now() < deadline,
                DriverNotReadySnafu { url: url.clone() }
            );
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Drop for ChromeDriverProcess {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            warn!("Error stopping chromedriver: {}", e);
        }
        let _ = self.child.wait();
    }
}
