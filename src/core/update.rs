//! Updating a lock file with `uv pip compile`
//!
//! The baseline lock file is pinned as solver constraints, `uv` computes a
//! new package set as `pylock.toml`, and every wheel that changed is placed
//! in the wheel directory and merged back into the lock file. The merge
//! never drops baseline entries the solver did not mention.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::config::defaults;
use crate::core::add_wheels::{add_wheels_to_spec, AddWheelsOptions};
use crate::core::check::{
    apply_policy, find_missing_dependencies, remove_depends, DependencyPolicy,
};
use crate::core::metadata::Requirement;
use crate::core::name::canonicalize_name;
use crate::core::pylock::{PyLock, WheelSource};
use crate::core::requirements::RequirementsFile;
use crate::core::spec::{PackageSpec, PyodideLockSpec};
use crate::core::wheel::read_metadata;
use crate::error::{FetchError, FilesystemError, ResolveError, UpdateError};
use crate::infra::download::{ArtifactStore, DownloadManager, DownloadRequest};
use crate::infra::filesystem;
use crate::infra::solver::{CompileRequest, UvSolver};

/// URL schemes `uv` can install from
const INSTALLABLE_URL_SCHEMES: &[&str] = &["http", "https", "file"];

/// Download retry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: defaults::MAX_DOWNLOAD_RETRIES,
            base_delay_ms: defaults::RETRY_BASE_DELAY_MS,
        }
    }
}

/// Update a lock file with `uv pip compile`
#[derive(Debug, Clone)]
pub struct UvPipCompile {
    /// Baseline `pyodide-lock.json`
    pub input_path: PathBuf,
    /// URL of the directory holding the baseline; relative entries are
    /// assumed local when unset
    pub input_base_url: Option<String>,
    /// Lock file to write; the input is updated in place when unset
    pub output_path: Option<PathBuf>,
    /// Where new wheels go; next to the output when unset
    pub wheel_dir: Option<PathBuf>,
    pub indent: Option<usize>,
    /// Keep remote URLs starting with these prefixes instead of local copies
    pub preserve_url_prefixes: Vec<String>,
    /// Point relative entries without a local file at this URL
    pub base_url_for_missing: Option<String>,

    /// PEP 508 specs to solve for
    pub specs: Vec<String>,
    /// Local wheels to solve for
    pub wheels: Vec<PathBuf>,
    /// Extra PEP 508 constraints, overriding the baseline pins
    pub constraints: Vec<String>,
    /// PEP 508 specs to leave out of the solve
    pub excludes: Vec<String>,
    /// Packages dropped from the baseline before solving
    pub remove: Vec<String>,

    pub python_platform: String,
    /// Explicit `uv`; falls back to `$UV_BIN`, then `PATH`
    pub uv_path: Option<PathBuf>,
    pub extra_uv_args: Vec<String>,

    /// Solver work directory; a temporary one is used when unset
    pub work_dir: Option<PathBuf>,
    pub dependency_policy: DependencyPolicy,
    pub retry: RetryConfig,
    /// Concurrent wheel downloads
    pub parallel: usize,
}

/// Result of a completed update
#[derive(Debug)]
pub struct UpdateOutcome {
    /// The lock spec as written
    pub spec: PyodideLockSpec,
    /// Wheels copied or fetched into the wheel directory, in solver order
    pub new_wheels: Vec<PathBuf>,
    /// Wheels that could not be fetched
    pub failed: Vec<FetchError>,
    pub output_path: PathBuf,
}

impl UpdateOutcome {
    /// Whether every solved wheel made it into the lock file
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Wheels placed in the wheel directory
#[derive(Debug, Default)]
struct Reconciled {
    wheels: Vec<PathBuf>,
    /// Canonical name -> URL each fetched wheel came from
    urls: IndexMap<String, String>,
    failed: Vec<FetchError>,
    /// Canonical names of the failed packages
    failed_names: BTreeSet<String>,
}

enum Slot {
    Ready(PathBuf),
    Pending(usize),
}

impl UvPipCompile {
    pub fn new(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            input_base_url: None,
            output_path: None,
            wheel_dir: None,
            indent: None,
            preserve_url_prefixes: Vec::new(),
            base_url_for_missing: None,
            specs: Vec::new(),
            wheels: Vec::new(),
            constraints: Vec::new(),
            excludes: Vec::new(),
            remove: Vec::new(),
            python_platform: defaults::UV_PYODIDE_PLATFORM.to_string(),
            uv_path: None,
            extra_uv_args: Vec::new(),
            work_dir: None,
            dependency_policy: DependencyPolicy::default(),
            retry: RetryConfig::default(),
            parallel: defaults::DEFAULT_PARALLEL_DOWNLOADS,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| self.input_path.clone())
    }

    pub fn wheel_dir(&self) -> PathBuf {
        self.wheel_dir
            .clone()
            .unwrap_or_else(|| parent_dir(&self.output_path()).to_path_buf())
    }

    fn input_dir(&self) -> &Path {
        parent_dir(&self.input_path)
    }

    /// Run the update, fetching over HTTP(S) or from the filesystem
    pub async fn update(&self) -> Result<UpdateOutcome, UpdateError> {
        let downloads =
            DownloadManager::with_config(self.retry.max_retries, self.retry.base_delay_ms);
        self.update_with(&downloads).await
    }

    /// Run the update, fetching through `downloads`
    pub async fn update_with<S: ArtifactStore>(
        &self,
        downloads: &DownloadManager<S>,
    ) -> Result<UpdateOutcome, UpdateError> {
        tracing::debug!("Configuration: {self:#?}");

        if let Some(work) = &self.work_dir {
            filesystem::create_dir_all(work)?;
            return self.run(work, downloads).await;
        }

        let work = tempfile::Builder::new()
            .prefix(defaults::WORK_DIR_PREFIX)
            .tempdir()
            .map_err(|e| FilesystemError::CreateDir {
                path: std::env::temp_dir(),
                error: e.to_string(),
            })?;
        self.run(work.path(), downloads).await
    }

    async fn run<S: ArtifactStore>(
        &self,
        work: &Path,
        downloads: &DownloadManager<S>,
    ) -> Result<UpdateOutcome, UpdateError> {
        let mut lock_spec = PyodideLockSpec::from_json(&self.input_path)?;
        for name in &self.remove {
            if lock_spec.remove_package(name).is_some() {
                tracing::info!("Removed {name} from the baseline");
            } else {
                tracing::warn!("Cannot remove {name}: not in {}", self.input_path.display());
            }
        }

        let output_path = self.output_path();
        let wheel_dir = self.wheel_dir();
        filesystem::create_dir_all(&wheel_dir)?;

        let pylock = self.solve(work, &lock_spec).await?;
        let reconciled = self
            .reconcile(&pylock, work, &wheel_dir, &lock_spec, downloads)
            .await?;

        let options = AddWheelsOptions {
            base_path: Some(self.input_dir().to_path_buf()),
            base_url: String::new(),
            ignore_missing_dependencies: !self.excludes.is_empty()
                || !reconciled.failed.is_empty(),
        };
        let mut spec = add_wheels_to_spec(&lock_spec, &reconciled.wheels, &options)?;

        self.postprocess(&mut spec, &wheel_dir, &output_path, &reconciled)?;
        spec.to_json(&output_path, self.indent)?;
        tracing::info!("Wrote {}", output_path.display());

        Ok(UpdateOutcome {
            spec,
            new_wheels: reconciled.wheels,
            failed: reconciled.failed,
            output_path,
        })
    }

    /// Write the solver inputs and run `uv pip compile`
    async fn solve(
        &self,
        work: &Path,
        lock_spec: &PyodideLockSpec,
    ) -> Result<PyLock, ResolveError> {
        let solver = UvSolver::locate(self.uv_path.as_deref())?;

        let wheel_specs = self
            .wheels
            .iter()
            .map(|w| wheel_to_pep508(w))
            .collect::<Result<Vec<_>, _>>()?;
        let requirements = RequirementsFile::from_raw_specs(
            &[self.specs.as_slice(), wheel_specs.as_slice()],
            None,
        )?;

        let lock_constraints = lock_spec
            .packages
            .values()
            .map(|p| self.package_spec_to_pep508(p))
            .collect::<Result<Vec<_>, _>>()?;
        let constraints = RequirementsFile::from_raw_specs(
            &[lock_constraints.as_slice(), self.constraints.as_slice()],
            Some(&requirements),
        )?;

        let excludes = if self.excludes.is_empty() {
            None
        } else {
            let file = RequirementsFile::from_raw_specs(&[self.excludes.as_slice()], None)?;
            Some(write_requirements(work, "excludes.txt", &file)?)
        };

        let request = CompileRequest {
            requirements: write_requirements(work, "requirements.in", &requirements)?,
            constraints: write_requirements(work, "constraints.txt", &constraints)?,
            excludes,
            output_file: work.join(defaults::PYLOCK_FILE),
            python_platform: self.python_platform.clone(),
            python_version: python_minor(&lock_spec.info.python),
            extra_args: self.extra_uv_args.clone(),
        };

        let path = solver.compile(&request).await?;
        let text = filesystem::read_file(&path)?;
        tracing::debug!("Reading {}:\n\n{}\n", path.display(), text);
        PyLock::from_toml(&text).map_err(|e| ResolveError::InvalidPylock {
            path,
            error: e.to_string(),
        })
    }

    /// Installable `name @ url` pin for a baseline entry
    fn package_spec_to_pep508(&self, package: &PackageSpec) -> Result<String, ResolveError> {
        let file_name = &package.file_name;
        let url = match url_scheme(file_name) {
            Some(scheme) if INSTALLABLE_URL_SCHEMES.contains(&scheme.as_str()) => {
                Some(file_name.clone())
            }
            Some(_) => None,
            None => {
                let local = self.input_dir().join(file_name);
                if local.exists() {
                    filesystem::file_uri(&local)
                } else {
                    self.input_base_url
                        .as_ref()
                        .map(|base| format!("{}/{file_name}", base.trim_end_matches('/')))
                }
            }
        };

        url.map(|url| format!("{} @ {url}", canonicalize_name(&package.name)))
            .ok_or_else(|| ResolveError::Pep508Url {
                name: package.name.clone(),
                file_name: file_name.clone(),
            })
    }

    /// Place every changed wheel from the solve in `wheel_dir`
    async fn reconcile<S: ArtifactStore>(
        &self,
        pylock: &PyLock,
        work: &Path,
        wheel_dir: &Path,
        lock_spec: &PyodideLockSpec,
        downloads: &DownloadManager<S>,
    ) -> Result<Reconciled, UpdateError> {
        let mut slots = Vec::new();
        let mut requests = Vec::new();
        let mut pending = Vec::new();

        for package in &pylock.packages {
            let unresolvable = || ResolveError::UnresolvableWheel {
                name: package.name.clone(),
            };
            match package.source().ok_or_else(unresolvable)? {
                WheelSource::Path(path) => {
                    let src = filesystem::absolute_path(&work.join(path));
                    let file_name = src.file_name().ok_or_else(unresolvable)?;
                    let dest = filesystem::absolute_path(&wheel_dir.join(file_name));
                    if src == dest {
                        continue;
                    }
                    filesystem::copy_file(&src, &dest)?;
                    slots.push(Slot::Ready(dest));
                }
                WheelSource::Url { url, sha256 } => {
                    let in_lock = lock_spec
                        .get_package(&package.name)
                        .map(|p| p.sha256.as_str())
                        .filter(|s| !s.is_empty());
                    if let (Some(known), Some(solved)) = (in_lock, sha256.as_deref()) {
                        if known.eq_ignore_ascii_case(solved) {
                            tracing::debug!("{} is unchanged", package.name);
                            continue;
                        }
                    }
                    let file_name = url_file_name(&url).ok_or_else(unresolvable)?;
                    tracing::debug!("Fetching wheel {file_name} from\n\t{url}");
                    slots.push(Slot::Pending(requests.len()));
                    pending.push((package.canonical_name(), url.clone()));
                    requests.push(DownloadRequest {
                        location: url,
                        dest: wheel_dir.join(file_name),
                        expected_sha256: sha256,
                    });
                }
            }
        }

        let mut results: Vec<_> = downloads
            .download_parallel(requests, self.parallel)
            .await
            .into_iter()
            .map(Some)
            .collect();

        let mut reconciled = Reconciled::default();
        for slot in slots {
            match slot {
                Slot::Ready(path) => reconciled.wheels.push(path),
                Slot::Pending(index) => {
                    let (name, url) = &pending[index];
                    match results[index].take() {
                        Some(Ok(result)) => {
                            reconciled.wheels.push(result.path);
                            reconciled.urls.insert(name.clone(), url.clone());
                        }
                        Some(Err(e)) => {
                            tracing::warn!("Could not fetch {name}: {e}");
                            reconciled.failed_names.insert(name.clone());
                            reconciled.failed.push(e);
                        }
                        None => {}
                    }
                }
            }
        }
        Ok(reconciled)
    }

    fn postprocess(
        &self,
        spec: &mut PyodideLockSpec,
        wheel_dir: &Path,
        output_path: &Path,
        reconciled: &Reconciled,
    ) -> Result<(), UpdateError> {
        let excluded = self
            .excludes
            .iter()
            .map(|e| Requirement::parse(e).map(|r| r.canonical_name()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(ResolveError::from)?;
        if !excluded.is_empty() {
            remove_depends(spec, &excluded);
        }

        // Failed fetches are reported on their own
        let mut missing = find_missing_dependencies(spec);
        for deps in missing.values_mut() {
            deps.retain(|d| !reconciled.failed_names.contains(&canonicalize_name(d)));
        }
        missing.retain(|_, deps| !deps.is_empty());
        apply_policy(missing, self.dependency_policy)?;

        if !self.preserve_url_prefixes.is_empty() {
            for (name, url) in &reconciled.urls {
                if !self.preserve_url_prefixes.iter().any(|p| url.starts_with(p.as_str())) {
                    continue;
                }
                if let Some(package) = spec.get_package_mut(name) {
                    use_remote_wheel(package, url, wheel_dir)?;
                }
            }
        }

        if let Some(base_url) = &self.base_url_for_missing {
            let output_dir = parent_dir(output_path);
            let base_url = base_url.trim_end_matches('/');
            for package in spec.packages.values_mut() {
                if package.is_remote() || output_dir.join(&package.file_name).exists() {
                    continue;
                }
                tracing::debug!("Using {base_url} for missing {}", package.file_name);
                package.file_name = format!("{base_url}/{}", package.file_name);
            }
        }
        Ok(())
    }
}

/// Replace a local wheel with the URL it was fetched from
fn use_remote_wheel(
    package: &mut PackageSpec,
    url: &str,
    wheel_dir: &Path,
) -> Result<(), FilesystemError> {
    if let Some(file_name) = Path::new(&package.file_name).file_name() {
        let local = wheel_dir.join(file_name);
        tracing::debug!(
            "Replacing wheel for {}:\n\t{}\n\t{url}",
            package.name,
            local.display()
        );
        filesystem::remove_file(&local)?;
    }
    package.file_name = url.to_string();
    Ok(())
}

/// `name @ file://…` requirement for a local wheel
fn wheel_to_pep508(wheel: &Path) -> Result<String, ResolveError> {
    let metadata = read_metadata(wheel)?;
    let uri = filesystem::file_uri(wheel).ok_or_else(|| ResolveError::Pep508Url {
        name: metadata.name.clone(),
        file_name: wheel.display().to_string(),
    })?;
    Ok(format!("{} @ {uri}", canonicalize_name(&metadata.name)))
}

fn write_requirements(
    work: &Path,
    file_name: &str,
    file: &RequirementsFile,
) -> Result<PathBuf, FilesystemError> {
    let path = work.join(file_name);
    let text = file.text();
    tracing::debug!("Writing {}:\n\n{}\n", path.display(), text);
    filesystem::write_file(&path, &text)?;
    Ok(path)
}

/// Directory containing `path`, `.` for a bare file name
fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// `3.12.1` -> `3.12`
fn python_minor(python: &str) -> String {
    python.split('.').take(2).collect::<Vec<_>>().join(".")
}

/// Lowercase URL scheme, if `location` has one
fn url_scheme(location: &str) -> Option<String> {
    let (scheme, _) = location.split_once(':')?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then(|| scheme.to_ascii_lowercase())
}

/// Last path segment of a URL
fn url_file_name(url: &str) -> Option<String> {
    let path = match reqwest::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    };
    path.rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spec::InfoSpec;
    use crate::infra::download::compute_checksum;
    use crate::test_utils::wheel::TestWheel;
    use tempfile::TempDir;

    const NUMPY_WHEEL: &str = "numpy-1.26.4-cp312-cp312-pyodide_2024_0_wasm32.whl";

    fn baseline() -> PyodideLockSpec {
        let mut spec =
            PyodideLockSpec::new(InfoSpec::new("emscripten_3_1_58", "0.27.0", "3.12.1"));
        let mut numpy = PackageSpec::new("numpy", "1.26.4", NUMPY_WHEEL, "site");
        numpy.sha256 = "0".repeat(64);
        numpy.imports = vec!["numpy".to_string()];
        spec.insert_package(numpy);
        spec
    }

    #[test]
    fn test_python_minor() {
        assert_eq!(python_minor("3.12.1"), "3.12");
        assert_eq!(python_minor("3.13"), "3.13");
    }

    #[test]
    fn test_url_scheme() {
        assert_eq!(url_scheme("https://example.org/a.whl").as_deref(), Some("https"));
        assert_eq!(url_scheme("FILE:///tmp/a.whl").as_deref(), Some("file"));
        assert_eq!(url_scheme("s3://bucket/a.whl").as_deref(), Some("s3"));
        assert_eq!(url_scheme("numpy-1.0-py3-none-any.whl"), None);
        assert_eq!(url_scheme("sub/dir/a.whl"), None);
    }

    #[test]
    fn test_url_file_name() {
        assert_eq!(
            url_file_name("https://files.example.org/a/b/six-1.16.0-py2.py3-none-any.whl?x=1")
                .as_deref(),
            Some("six-1.16.0-py2.py3-none-any.whl")
        );
        assert_eq!(url_file_name("https://files.example.org/"), None);
    }

    #[test]
    fn test_constraint_for_remote_entry() {
        let upc = UvPipCompile::new("dist/pyodide-lock.json");
        let mut package = PackageSpec::new(
            "Six",
            "1.16.0",
            "https://cdn.example.org/six-1.16.0-py2.py3-none-any.whl",
            "site",
        );
        assert_eq!(
            upc.package_spec_to_pep508(&package).unwrap(),
            "six @ https://cdn.example.org/six-1.16.0-py2.py3-none-any.whl"
        );

        package.file_name = "s3://bucket/six-1.16.0-py2.py3-none-any.whl".to_string();
        assert!(matches!(
            upc.package_spec_to_pep508(&package),
            Err(ResolveError::Pep508Url { .. })
        ));
    }

    #[test]
    fn test_constraint_for_relative_entry() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("pyodide-lock.json");
        std::fs::write(tmp.path().join(NUMPY_WHEEL), b"wheel").unwrap();
        let package = PackageSpec::new("numpy", "1.26.4", NUMPY_WHEEL, "site");

        let mut upc = UvPipCompile::new(&input);
        let local = upc.package_spec_to_pep508(&package).unwrap();
        assert!(local.starts_with("numpy @ file://"));
        assert!(local.ends_with(NUMPY_WHEEL));

        let missing = PackageSpec::new("scipy", "1.0", "scipy-1.0-cp312-cp312-any.whl", "site");
        assert!(upc.package_spec_to_pep508(&missing).is_err());

        upc.input_base_url = Some("https://cdn.example.org/full/".to_string());
        assert_eq!(
            upc.package_spec_to_pep508(&missing).unwrap(),
            "scipy @ https://cdn.example.org/full/scipy-1.0-cp312-cp312-any.whl"
        );
    }

    #[test]
    fn test_wheel_to_pep508() {
        let tmp = TempDir::new().unwrap();
        let wheel = TestWheel::new("Py.One").build(tmp.path());
        let spec = wheel_to_pep508(&wheel).unwrap();
        assert!(spec.starts_with("py-one @ file://"), "{spec}");
    }

    #[test]
    fn test_default_paths() {
        let upc = UvPipCompile::new("pyodide-lock.json");
        assert_eq!(upc.output_path(), PathBuf::from("pyodide-lock.json"));
        assert_eq!(upc.wheel_dir(), PathBuf::from("."));

        let mut upc = UvPipCompile::new("in/pyodide-lock.json");
        upc.output_path = Some(PathBuf::from("out/pyodide-lock.json"));
        assert_eq!(upc.wheel_dir(), PathBuf::from("out"));
    }

    #[cfg(unix)]
    mod with_fake_solver {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        struct Fixture {
            tmp: TempDir,
            upc: UvPipCompile,
        }

        impl Fixture {
            fn dist(&self) -> PathBuf {
                self.tmp.path().join("dist")
            }

            fn read(&self, path: &str) -> String {
                std::fs::read_to_string(self.tmp.path().join(path)).unwrap()
            }
        }

        /// Baseline, source wheels, a prepared `pylock.toml` and a fake `uv`
        /// that copies it to `--output-file`
        fn fixture(extra_pylock: &str) -> Fixture {
            let tmp = TempDir::new().unwrap();
            let dist = tmp.path().join("dist");
            let src = tmp.path().join("src");
            std::fs::create_dir_all(&dist).unwrap();
            std::fs::create_dir_all(&src).unwrap();

            baseline()
                .to_json(&dist.join("pyodide-lock.json"), None)
                .unwrap();

            let py_one = TestWheel::new("py-one").module("one").build(&src);
            let needs_one = TestWheel::new("needs-one").requires("py_one").build(&src);
            let needs_one_sha = compute_checksum(&std::fs::read(&needs_one).unwrap());

            let pylock = format!(
                r#"lock-version = "1.0"
created-by = "uv"

[[packages]]
name = "needs-one"
version = "1.0.0"
wheels = [{{ url = "file://{needs_one}", hashes = {{ sha256 = "{needs_one_sha}" }} }}]

[[packages]]
name = "py-one"
version = "1.0.0"
archive = {{ path = "{py_one}" }}
{extra_pylock}"#,
                needs_one = needs_one.display(),
                py_one = py_one.display(),
            );
            let pylock_path = tmp.path().join("prepared-pylock.toml");
            std::fs::write(&pylock_path, pylock).unwrap();

            let script = tmp.path().join("uv");
            std::fs::write(
                &script,
                format!(
                    "#!/bin/sh\necho \"$@\" > '{args}'\nfor arg in \"$@\"; do\n  case \"$arg\" in\n    --output-file=*) out=\"${{arg#--output-file=}}\" ;;\n  esac\ndone\necho 'Resolved 2 packages'\ncp '{pylock}' \"$out\"\n",
                    args = tmp.path().join("args.txt").display(),
                    pylock = pylock_path.display(),
                ),
            )
            .unwrap();
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

            let mut upc = UvPipCompile::new(dist.join("pyodide-lock.json"));
            upc.output_path = Some(dist.join("pyodide-lock-new.json"));
            upc.wheel_dir = Some(dist.join("wheels"));
            upc.work_dir = Some(tmp.path().join("work"));
            upc.input_base_url = Some("https://cdn.example.org/full".to_string());
            upc.uv_path = Some(script);
            upc.specs = vec!["needs-one".to_string()];
            upc.retry = RetryConfig {
                max_retries: 1,
                base_delay_ms: 1,
            };

            Fixture { tmp, upc }
        }

        #[tokio::test]
        async fn test_update_adds_solved_wheels() {
            let fx = fixture("");
            let outcome = fx.upc.update().await.unwrap();

            assert!(outcome.is_complete());
            assert_eq!(outcome.new_wheels.len(), 2);
            let spec = &outcome.spec;
            let keys: Vec<_> = spec.packages.keys().cloned().collect();
            assert_eq!(keys, vec!["numpy", "needs-one", "py-one"]);
            assert_eq!(spec.packages["numpy"], baseline().packages["numpy"]);
            assert_eq!(spec.packages["needs-one"].depends, vec!["py-one"]);
            assert_eq!(
                spec.packages["py-one"].file_name,
                "wheels/py_one-1.0.0-py3-none-any.whl"
            );
            assert_eq!(spec.packages["py-one"].imports, vec!["one"]);
            assert!(fx.dist().join("wheels/needs_one-1.0.0-py3-none-any.whl").is_file());

            assert_eq!(fx.read("work/requirements.in"), "needs-one");
            assert_eq!(
                fx.read("work/constraints.txt"),
                format!("numpy @ https://cdn.example.org/full/{NUMPY_WHEEL}")
            );
            assert!(!fx.tmp.path().join("work/excludes.txt").exists());
            let args = fx.read("args.txt");
            assert!(args.starts_with("pip compile --format=pylock.toml --no-build"));
            assert!(args.contains("--python-platform=wasm32-pyodide2024"));
            assert!(args.contains("--python-version=3.12 "));

            let written = PyodideLockSpec::from_json(&outcome.output_path).unwrap();
            assert_eq!(&written, spec);
        }

        #[tokio::test]
        async fn test_update_twice_is_idempotent() {
            let fx = fixture("");
            let first = fx.upc.update().await.unwrap();
            let before = std::fs::read_to_string(&first.output_path).unwrap();

            let mut again = fx.upc.clone();
            again.input_path = first.output_path.clone();
            again.output_path = None;
            let second = again.update().await.unwrap();

            assert_eq!(std::fs::read_to_string(&second.output_path).unwrap(), before);
            // needs-one is pinned by hash, only the local archive is copied again
            assert_eq!(second.new_wheels.len(), 1);
        }

        #[tokio::test]
        async fn test_preserve_url_prefixes() {
            let mut fx = fixture("");
            fx.upc.preserve_url_prefixes = vec!["file://".to_string()];
            let outcome = fx.upc.update().await.unwrap();

            let needs_one = &outcome.spec.packages["needs-one"];
            assert!(needs_one.file_name.starts_with("file://"));
            assert!(!fx.dist().join("wheels/needs_one-1.0.0-py3-none-any.whl").exists());
            assert!(fx.dist().join("wheels/py_one-1.0.0-py3-none-any.whl").exists());
        }

        #[tokio::test]
        async fn test_base_url_for_missing() {
            let mut fx = fixture("");
            fx.upc.base_url_for_missing = Some("https://cdn.example.org/full/".to_string());
            let outcome = fx.upc.update().await.unwrap();

            assert_eq!(
                outcome.spec.packages["numpy"].file_name,
                format!("https://cdn.example.org/full/{NUMPY_WHEEL}")
            );
            assert_eq!(
                outcome.spec.packages["py-one"].file_name,
                "wheels/py_one-1.0.0-py3-none-any.whl"
            );
        }

        #[tokio::test]
        async fn test_fetch_failure_does_not_abort() {
            let fx = fixture(
                r#"
[[packages]]
name = "ghost"
version = "1.0"
wheels = [{ url = "file:///nonexistent/ghost-1.0-py3-none-any.whl" }]
"#,
            );
            let outcome = fx.upc.update().await.unwrap();

            assert!(!outcome.is_complete());
            assert_eq!(outcome.failed.len(), 1);
            assert!(outcome.failed[0].location().contains("ghost"));
            assert!(outcome.spec.packages.contains_key("needs-one"));
            assert!(!outcome.spec.packages.contains_key("ghost"));
            assert!(outcome.output_path.is_file());
        }

        #[tokio::test]
        async fn test_checksum_mismatch_is_a_fetch_failure() {
            use wiremock::matchers::{method, path};
            use wiremock::{Mock, MockServer, ResponseTemplate};

            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/six-1.16.0-py3-none-any.whl"))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(b"corrupted".to_vec()))
                .mount(&server)
                .await;
            let fx = fixture(&format!(
                r#"
[[packages]]
name = "six"
version = "1.16.0"
wheels = [{{ url = "{}/six-1.16.0-py3-none-any.whl", hashes = {{ sha256 = "{}" }} }}]
"#,
                server.uri(),
                "a".repeat(64)
            ));
            let existing = fx.dist().join("wheels/six-1.16.0-py3-none-any.whl");
            std::fs::create_dir_all(fx.dist().join("wheels")).unwrap();
            std::fs::write(&existing, b"baseline wheel").unwrap();

            let outcome = fx.upc.update().await.unwrap();

            assert_eq!(outcome.failed.len(), 1);
            assert!(matches!(
                outcome.failed[0],
                FetchError::ChecksumMismatch { .. }
            ));
            assert!(outcome.output_path.is_file());
            assert!(outcome.spec.packages.contains_key("needs-one"));
            assert!(!outcome.spec.packages.contains_key("six"));
            assert_eq!(std::fs::read(&existing).unwrap(), b"baseline wheel");
        }

        #[tokio::test]
        async fn test_excludes_are_removed_from_depends() {
            let mut fx = fixture("");
            fx.upc.excludes = vec!["py-one".to_string()];
            fx.upc.dependency_policy = DependencyPolicy::Error;
            let outcome = fx.upc.update().await.unwrap();

            assert_eq!(fx.read("work/excludes.txt"), "py-one");
            assert!(outcome.spec.packages["needs-one"].depends.is_empty());
        }

        #[tokio::test]
        async fn test_remove_drops_baseline_entry() {
            let mut fx = fixture("");
            fx.upc.remove = vec!["NumPy".to_string()];
            let outcome = fx.upc.update().await.unwrap();

            assert!(!outcome.spec.packages.contains_key("numpy"));
            assert_eq!(fx.read("work/constraints.txt"), "");
        }

        #[tokio::test]
        async fn test_solver_failure_writes_nothing() {
            let mut fx = fixture("");
            let script = fx.tmp.path().join("failing-uv");
            std::fs::write(&script, "#!/bin/sh\necho 'No solution found' >&2\nexit 2\n").unwrap();
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
            fx.upc.uv_path = Some(script);

            let err = fx.upc.update().await.unwrap_err();
            match err {
                UpdateError::Resolve(ResolveError::SolverFailed { output, .. }) => {
                    assert!(output.contains("No solution found"));
                }
                other => panic!("unexpected error: {other}"),
            }
            assert!(!fx.dist().join("pyodide-lock-new.json").exists());
        }
    }
}
