//! PNG export of the rendered map through whatever headless tool is installed.

use std::{
    fs, io,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::{bail, Context, Result};
use reqwest::Url;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Job {
    pub html: PathBuf,
    pub png: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl Job {
    fn url(&self) -> Result<Url> {
        let path = fs::canonicalize(&self.html)
            .with_context(|| format!("failed to resolve {}", self.html.display()))?;
        Url::from_file_path(&path)
            .ok()
            .with_context(|| format!("{} is not a valid file url", path.display()))
    }
}

/// One way of turning the HTML map into an image.
pub trait Exporter {
    fn name(&self) -> &str;
    fn attempt(&self, job: &Job) -> Result<()>;
}

/// Tries every exporter in order and returns the name of the first one that succeeded.
pub fn export<'a>(exporters: &'a [Box<dyn Exporter>], job: &Job) -> Option<&'a str> {
    for exporter in exporters {
        match exporter.attempt(job) {
            Ok(()) => return Some(exporter.name()),
            Err(e) => debug!(exporter = exporter.name(), "snapshot failed: {e:#}"),
        }
    }
    None
}

pub fn default_exporters() -> Vec<Box<dyn Exporter>> {
    vec![
        Box::new(Chrome::default()),
        Box::new(Firefox::default()),
        Box::new(WkHtmlToImage::default()),
    ]
}

/// Headless Chrome or Chromium, whichever binary is found first.
pub struct Chrome {
    pub binaries: Vec<String>,
    /// Milliseconds of page time allowed for tiles to load.
    pub budget_ms: u32,
}

impl Default for Chrome {
    fn default() -> Self {
        Self {
            binaries: ["chromium", "chromium-browser", "google-chrome", "google-chrome-stable"]
                .map(String::from)
                .to_vec(),
            budget_ms: 2000,
        }
    }
}

impl Exporter for Chrome {
    fn name(&self) -> &str {
        "chrome"
    }

    fn attempt(&self, job: &Job) -> Result<()> {
        let url = job.url()?;
        let args = [
            "--headless=new".to_owned(),
            "--hide-scrollbars".to_owned(),
            "--disable-gpu".to_owned(),
            format!("--window-size={},{}", job.width, job.height),
            format!("--virtual-time-budget={}", self.budget_ms),
            format!("--screenshot={}", job.png.display()),
            url.to_string(),
        ];
        remove_stale(&job.png)?;
        run_first(&self.binaries, &args)?;
        ensure_written(&job.png)
    }
}

pub struct Firefox {
    pub binary: String,
}

impl Default for Firefox {
    fn default() -> Self {
        Self {
            binary: "firefox".to_owned(),
        }
    }
}

impl Exporter for Firefox {
    fn name(&self) -> &str {
        "firefox"
    }

    fn attempt(&self, job: &Job) -> Result<()> {
        let url = job.url()?;
        let args = [
            "--headless".to_owned(),
            format!("--window-size={},{}", job.width, job.height),
            "--screenshot".to_owned(),
            job.png.display().to_string(),
            url.to_string(),
        ];
        remove_stale(&job.png)?;
        run(&self.binary, &args)?;
        ensure_written(&job.png)
    }
}

pub struct WkHtmlToImage {
    pub binary: String,
    pub delay_ms: u32,
}

impl Default for WkHtmlToImage {
    fn default() -> Self {
        Self {
            binary: "wkhtmltoimage".to_owned(),
            delay_ms: 2500,
        }
    }
}

impl Exporter for WkHtmlToImage {
    fn name(&self) -> &str {
        "wkhtmltoimage"
    }

    fn attempt(&self, job: &Job) -> Result<()> {
        let args = [
            "--quiet".to_owned(),
            "--enable-local-file-access".to_owned(),
            "--width".to_owned(),
            job.width.to_string(),
            "--height".to_owned(),
            job.height.to_string(),
            "--javascript-delay".to_owned(),
            self.delay_ms.to_string(),
            job.html.display().to_string(),
            job.png.display().to_string(),
        ];
        remove_stale(&job.png)?;
        run(&self.binary, &args)?;
        ensure_written(&job.png)
    }
}

fn run(binary: &str, args: &[String]) -> Result<()> {
    let status = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("failed to start {binary}"))?;
    if !status.success() {
        bail!("{binary} exited with {status}");
    }
    Ok(())
}

fn run_first(binaries: &[String], args: &[String]) -> Result<()> {
    let mut last = None;
    for binary in binaries {
        match run(binary, args) {
            Ok(()) => return Ok(()),
            Err(e) => last = Some(e),
        }
    }
    Err(last.unwrap_or_else(|| anyhow::anyhow!("no binary configured")))
}

// a previous run's image must not pass for this run's output
fn remove_stale(png: &Path) -> Result<()> {
    match fs::remove_file(png) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to remove {}", png.display())),
    }
}

fn ensure_written(png: &Path) -> Result<()> {
    let len = fs::metadata(png)
        .with_context(|| format!("{} was not created", png.display()))?
        .len();
    if len == 0 {
        bail!("{} is empty", png.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    struct Fake {
        name: &'static str,
        ok: bool,
        calls: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Exporter for Fake {
        fn name(&self) -> &str {
            self.name
        }

        fn attempt(&self, _job: &Job) -> Result<()> {
            self.calls.borrow_mut().push(self.name);
            if self.ok {
                Ok(())
            } else {
                bail!("unavailable")
            }
        }
    }

    fn job(dir: &Path) -> Job {
        let html = dir.join("map.html");
        fs::write(&html, "<html></html>").unwrap();
        Job {
            html,
            png: dir.join("map.png"),
            width: 320,
            height: 200,
        }
    }

    #[test]
    fn first_success_wins() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let fake = |name, ok| -> Box<dyn Exporter> {
            Box::new(Fake {
                name,
                ok,
                calls: calls.clone(),
            })
        };
        let exporters = vec![fake("a", false), fake("b", true), fake("c", true)];

        let dir = tempfile::tempdir().unwrap();
        assert_eq!(export(&exporters, &job(dir.path())), Some("b"));
        assert_eq!(*calls.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn all_fail() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let exporters: Vec<Box<dyn Exporter>> = vec![Box::new(Fake {
            name: "a",
            ok: false,
            calls: calls.clone(),
        })];
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(export(&exporters, &job(dir.path())), None);
        assert_eq!(export(&[], &job(dir.path())), None);
    }

    #[test]
    fn missing_binaries() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());

        let chrome = Chrome {
            binaries: vec!["tracemap-no-such-browser".to_owned()],
            budget_ms: 0,
        };
        assert!(chrome.attempt(&job).is_err());

        let firefox = Firefox {
            binary: "tracemap-no-such-browser".to_owned(),
        };
        assert!(firefox.attempt(&job).is_err());

        let wk = WkHtmlToImage {
            binary: "tracemap-no-such-tool".to_owned(),
            delay_ms: 0,
        };
        assert!(wk.attempt(&job).is_err());
        assert!(!job.png.exists());
    }

    #[cfg(unix)]
    #[test]
    fn stale_png_is_not_success() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());
        fs::write(&job.png, b"old snapshot").unwrap();

        // exits cleanly without writing anything
        let chrome = Chrome {
            binaries: vec!["true".to_owned()],
            budget_ms: 0,
        };
        assert!(chrome.attempt(&job).is_err());
        assert!(!job.png.exists());

        fs::write(&job.png, b"old snapshot").unwrap();
        let wk = WkHtmlToImage {
            binary: "true".to_owned(),
            delay_ms: 0,
        };
        assert!(wk.attempt(&job).is_err());
        assert!(!job.png.exists());
    }

    #[test]
    fn file_url() {
        let dir = tempfile::tempdir().unwrap();
        let url = job(dir.path()).url().unwrap();
        assert_eq!(url.scheme(), "file");
        assert!(url.path().ends_with("/map.html"));
    }
}
