use std::rc::Rc;

use plantnav_core::{
    DomEnvironment, ElementRef, ExError, MemoryDom, RecordingEventBus, RuleTable,
};
use plantnav_engine::{
    LocalModeAuthority, ManualConnectionProbe, MemoryViewSubsystem, ModeAuthority, Navigator,
    NavigatorConfig,
};

/// Locators of every layer and panel element in the built-in rules
pub const BUILTIN_ELEMENTS: [&str; 8] = [
    "#threejs-container",
    "#view-container",
    "#overlay-ui",
    "#layout-editor-container",
    "#connection-status-banner",
    "#equipment-info-panel",
    "#layout-property-panel",
    "#debug-panel",
];

#[allow(dead_code)]
pub struct Fixture {
    pub navigator: Navigator,
    pub bus: Rc<RecordingEventBus>,
    pub authority: Rc<LocalModeAuthority>,
    pub views: Rc<MemoryViewSubsystem>,
    pub probe: Rc<ManualConnectionProbe>,
    pub dom: Rc<MemoryDom>,
}

/// Navigator over in-memory collaborators, connected, not yet started
#[allow(dead_code)]
pub fn fixture() -> Fixture {
    fixture_with(NavigatorConfig::default(), true)
}

#[allow(dead_code)]
pub fn fixture_with(config: NavigatorConfig, connected: bool) -> Fixture {
    let authority = Rc::new(LocalModeAuthority::with_mode("MAIN_VIEWER"));
    let (navigator, bus, views, probe, dom) = build(config, connected, authority.clone());
    Fixture {
        navigator,
        bus,
        authority,
        views,
        probe,
        dom,
    }
}

/// Navigator over in-memory collaborators and the given authority
#[allow(dead_code, clippy::type_complexity)]
pub fn build(
    config: NavigatorConfig,
    connected: bool,
    authority: Rc<dyn ModeAuthority>,
) -> (
    Navigator,
    Rc<RecordingEventBus>,
    Rc<MemoryViewSubsystem>,
    Rc<ManualConnectionProbe>,
    Rc<MemoryDom>,
) {
    let rules = Rc::new(RuleTable::builtin().unwrap());
    let bus = Rc::new(RecordingEventBus::new());
    let views = Rc::new(MemoryViewSubsystem::new());
    let probe = Rc::new(ManualConnectionProbe::new(connected));
    let dom = Rc::new(MemoryDom::with_elements(BUILTIN_ELEMENTS));
    // panels start closed so the start-up scan finds nothing
    let info = dom.lookup("#equipment-info-panel").unwrap();
    dom.set_style(&info, "display", "none").unwrap();
    let debug = dom.lookup("#debug-panel").unwrap();
    dom.add_class(&debug, "hidden").unwrap();

    let banner = |dom: &dyn DomEnvironment, el: &ElementRef, visible: bool| {
        dom.set_style(el, "visibility", if visible { "visible" } else { "hidden" })
    };

    let navigator = Navigator::builder(rules)
        .config(config)
        .bus(bus.clone())
        .authority(authority)
        .views(views.clone())
        .probe(probe.clone())
        .dom(dom.clone())
        .layer_handler("status-banner", Rc::new(banner))
        .build()
        .unwrap();

    (navigator, bus, views, probe, dom)
}

/// Fixture that has already applied the home state, with the bus cleared
#[allow(dead_code)]
pub async fn started() -> Fixture {
    let f = fixture();
    assert!(f.navigator.start().await);
    f.bus.clear();
    f
}

/// Close handle that always succeeds
#[allow(dead_code)]
pub fn noop_handle() -> Rc<dyn plantnav_core::PanelHandle> {
    Rc::new(|| -> Result<(), ExError> { Ok(()) })
}
