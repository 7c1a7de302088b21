use pagepatch_core::{
    Capabilities, Capability, EditRequest, EditSession, EditorConfig, EditorHandler, EditorKind,
    PassthroughEditor, RequestContext, StatusEntry, UploadedFile,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PAGE: &str = "---\ntitle: Home\n---\n<div data-editable data-name=\"title\">Old</div><!-- end editable -->\n";

fn passthrough(_kind: EditorKind) -> Box<dyn EditorHandler> {
    Box::new(PassthroughEditor)
}

struct Site {
    temp: TempDir,
}

impl Site {
    fn new() -> Self {
        let temp = TempDir::new().expect("tempdir");
        fs::write(temp.path().join("index.md"), PAGE).expect("write page");
        Self { temp }
    }

    fn root(&self) -> &Path {
        self.temp.path()
    }

    fn page(&self) -> String {
        fs::read_to_string(self.root().join("index.md")).expect("read page")
    }

    fn session(&self, payload: Option<&str>, capabilities: Capabilities) -> EditSession {
        self.session_with_upload(payload, None, capabilities)
    }

    fn session_with_upload(
        &self,
        payload: Option<&str>,
        upload: Option<UploadedFile>,
        capabilities: Capabilities,
    ) -> EditSession {
        let request = EditRequest {
            payload: payload.map(|raw| raw.as_bytes().to_vec()),
            upload,
        };
        let ctx = RequestContext {
            content_root: self.root().to_path_buf(),
            request_file: self.root().join("index.md"),
            base_url: "https://example.org/".to_string(),
            capabilities,
            config: EditorConfig::default(),
        };
        EditSession::new(request, ctx, passthrough)
    }
}

#[test]
fn saves_a_submitted_region() {
    let site = Site::new();
    let mut session = site.session(Some(r#"{"regions":{"title":"New"}}"#), Capabilities::all());

    let content = session.content_loaded(&site.page());
    let response = session.page_rendered(&content).expect("response");

    assert!(site.page().contains(">New</div><!-- end editable -->"));
    assert_eq!(
        response.status.entries(),
        [StatusEntry::success("The page has been saved")]
    );
    assert_eq!(response.edited.regions.len(), 1);
    let outcome = &response.edited.regions[0];
    assert_eq!(outcome.name(), "title");
    assert!(outcome.is_saved());
}

#[test]
fn unknown_region_is_reported_without_outcome() {
    let site = Site::new();
    let mut session = site.session(Some(r#"{"regions":{"missing":"X"}}"#), Capabilities::all());

    let content = session.content_loaded(&site.page());
    let response = session.page_rendered(&content).expect("response");

    assert_eq!(site.page(), PAGE);
    assert!(response.edited.regions.is_empty());
    assert_eq!(
        response.status.entries(),
        [StatusEntry::failure("No corresponding block found for \"missing\"")]
    );
}

#[test]
fn caller_without_save_right_changes_nothing() {
    let site = Site::new();
    let capabilities = Capabilities::all().with(Capability::Save, false);
    let payload = r#"{"meta":"title: Hacked","regions":{"title":"New"}}"#;
    let mut session = site.session(Some(payload), capabilities);

    let content = session.content_loaded(&site.page());
    let response = session.page_rendered(&content).expect("response");

    assert_eq!(site.page(), PAGE);
    assert_eq!(
        response.status.entries(),
        [StatusEntry::failure("You don't have the rights to save content")]
    );
    assert!(response.edited.regions.is_empty());
}

#[test]
fn duplicate_regions_are_written_once_and_flagged() {
    let site = Site::new();
    let page = concat!(
        "<p data-editable data-name=\"dup\">one</p><!-- end editable -->\n",
        "<p data-editable data-name=\"dup\">two</p><!-- end editable -->\n",
    );
    fs::write(site.root().join("index.md"), page).unwrap();
    let mut session = site.session(Some(r#"{"regions":{"dup":"new"}}"#), Capabilities::all());

    let content = session.content_loaded(page);
    let response = session.page_rendered(&content).expect("response");

    assert_eq!(site.page(), page.replacen(">one<", ">new<", 1));
    assert_eq!(response.edited.regions.len(), 1);
    assert_eq!(
        response.status.entries(),
        [
            StatusEntry::success("The page has been saved"),
            StatusEntry::failure(
                "Region \"dup\" is defined more than once; only the first one was saved"
            ),
        ]
    );
}

#[test]
fn theme_regions_are_saved_from_rendered_output() {
    let site = Site::new();
    let theme = site.root().join("themes");
    fs::create_dir(&theme).unwrap();
    let footer = "<footer data-editable data-name=\"footer\" data-src=\"themes/footer.twig\">(c) 2019</footer>\n<!-- end editable -->\n";
    fs::write(theme.join("footer.twig"), footer).unwrap();

    let payload = r#"{"regions":{"title":"New","footer":"(c) 2024"}}"#;
    let mut session = site.session(Some(payload), Capabilities::all());
    let content = session.content_loaded(&site.page());
    let output = format!("<html><body>{content}{footer}</body></html>");
    let response = session.page_rendered(&output).expect("response");

    assert_eq!(
        fs::read_to_string(theme.join("footer.twig")).unwrap(),
        footer.replace("2019", "2024")
    );
    assert!(site.page().contains(">New</div>"));
    assert_eq!(
        response.status.entries(),
        [
            StatusEntry::success("The page has been saved"),
            StatusEntry::success("The theme files have been saved"),
        ]
    );
    let names: Vec<_> = response.edited.regions.iter().map(|r| r.name()).collect();
    assert_eq!(names, ["title", "footer"]);
}

#[test]
fn stale_page_is_not_overwritten() {
    let site = Site::new();
    let loaded = site.page();
    let changed = PAGE.replace(">Old<", ">Changed by someone else<");
    fs::write(site.root().join("index.md"), &changed).unwrap();

    let mut session = site.session(Some(r#"{"regions":{"title":"New"}}"#), Capabilities::all());
    let content = session.content_loaded(&loaded);
    let response = session.page_rendered(&content).expect("response");

    assert_eq!(site.page(), changed);
    assert_eq!(
        response.edited.regions[0].message(),
        Some("Error replacing region content")
    );
    assert_eq!(
        response.status.entries(),
        [StatusEntry::failure(
            "Region \"title\" couldn't be saved: Error replacing region content"
        )]
    );
}

#[test]
fn missing_source_file_is_reported() {
    let site = Site::new();
    let footer = "<footer data-editable data-name=\"footer\" data-src=\"themes/gone.twig\">x</footer><!-- end editable -->";
    let mut session = site.session(Some(r#"{"regions":{"footer":"y"}}"#), Capabilities::all());

    let content = session.content_loaded(&site.page());
    let response = session
        .page_rendered(&format!("{content}{footer}"))
        .expect("response");

    assert_eq!(
        response.status.entries(),
        [StatusEntry::failure(
            "Region \"footer\" couldn't be saved: Source file not found"
        )]
    );
}

#[test]
fn identical_duplicates_are_not_claimed_as_saved() {
    let site = Site::new();
    let page = concat!(
        "<p data-editable data-name=\"dup\">same</p><!-- end editable -->\n",
        "<p data-editable data-name=\"dup\">same</p><!-- end editable -->\n",
    );
    fs::write(site.root().join("index.md"), page).unwrap();
    let mut session = site.session(Some(r#"{"regions":{"dup":"new"}}"#), Capabilities::all());

    let content = session.content_loaded(page);
    let response = session.page_rendered(&content).expect("response");

    assert_eq!(site.page(), page);
    assert_eq!(
        response.status.entries(),
        [
            StatusEntry::failure("Region \"dup\" couldn't be saved: Error replacing region content"),
            StatusEntry::failure(
                "Region \"dup\" is defined more than once; none of its copies were saved"
            ),
        ]
    );
}

#[test]
fn upload_needs_the_upload_right() {
    let site = Site::new();
    fs::create_dir(site.root().join("images")).unwrap();
    let file = UploadedFile {
        name: "photo.txt".to_string(),
        contents: b"bytes".to_vec(),
    };
    let capabilities = Capabilities::all().with(Capability::Upload, false);
    let mut session = site.session_with_upload(None, Some(file), capabilities);

    let content = session.content_loaded(&site.page());
    let response = session.page_rendered(&content).expect("response");

    assert!(response.file.is_none());
    assert_eq!(
        response.status.entries(),
        [StatusEntry::failure("You don't have the rights to upload files")]
    );
    assert!(!site.root().join("images/photo.txt").exists());
}

#[test]
fn upload_is_stored_and_described() {
    let site = Site::new();
    fs::create_dir(site.root().join("images")).unwrap();
    let file = UploadedFile {
        name: "notes.txt".to_string(),
        contents: b"bytes".to_vec(),
    };
    let mut session = site.session_with_upload(None, Some(file), Capabilities::all());

    let content = session.content_loaded(&site.page());
    let response = session.page_rendered(&content).expect("response");

    let file = response.file.expect("upload output");
    assert_eq!(file.path, "https://example.org/images/notes.txt");
    assert_eq!(
        response.status.entries(),
        [StatusEntry::success("The file has been uploaded")]
    );
    assert_eq!(fs::read(site.root().join("images/notes.txt")).unwrap(), b"bytes");
}
