use std::cell::{Cell, OnceCell};

use arbor_core::prelude::*;
use arbor_navigation::{Navigator, PushFlag};

#[derive(Clone, Debug, PartialEq)]
enum Screen {
    Home,
    Details(u32),
    Confirm,
}

struct App {
    nav: OnceCell<Navigator<Screen>>,
}

impl App {
    fn nav(&self) -> Option<&Navigator<Screen>> {
        self.nav.get()
    }
}

impl Interactor for App {
    fn did_become_active(&self, handle: &InteractorHandle, _saved: Option<&Bundle>) {
        let host = match handle.node() {
            Ok(host) => host,
            Err(e) => {
                log::error!("app has no node: {e}");
                return;
            }
        };
        let nav = self.nav.get_or_init(|| Navigator::new(&host));
        let ctx = host.context().clone();
        if let Err(e) = nav.push_state(Screen::Home, PushFlag::Default, move || {
            Node::new(&ctx, Page::new("home"))
        }) {
            log::error!("could not show home: {e}");
        }
    }

    fn will_resign_active(&self, _handle: &InteractorHandle) {
        if let Some(nav) = self.nav()
            && let Err(e) = nav.detach_all()
        {
            log::error!("navigator teardown failed: {e}");
        }
    }

    fn handle_back_press(&self, _handle: &InteractorHandle) -> bool {
        let Some(nav) = self.nav() else {
            return false;
        };
        if let Some(top) = nav.peek_router()
            && top.handle_back_press()
        {
            return true;
        }
        if nav.size() <= 1 {
            return false;
        }
        nav.pop_state().is_ok()
    }
}

/// A screen that remembers how many times it was shown.
struct Page {
    name: &'static str,
    visits: Cell<i64>,
}

impl Page {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            visits: Cell::new(0),
        }
    }
}

impl Interactor for Page {
    fn did_become_active(&self, _handle: &InteractorHandle, saved: Option<&Bundle>) {
        if let Some(saved) = saved {
            self.visits.set(saved.get_int("visits", 0));
        }
        self.visits.set(self.visits.get() + 1);
        log::info!("{} shown ({} visits)", self.name, self.visits.get());
    }

    fn will_resign_active(&self, _handle: &InteractorHandle) {
        log::info!("{} hidden", self.name);
    }

    fn on_save_instance_state(&self, out: &mut Bundle) {
        out.put_int("visits", self.visits.get());
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let config = Configuration::builder()
        .error_sink(LenientErrorSink)?
        .breadcrumbs(true)
        .build();
    let ctx = TreeContext::new(config);
    let root = Node::new(
        &ctx,
        App {
            nav: OnceCell::new(),
        },
    );
    root.dispatch_attach(None)?;

    let app = root
        .interactor()
        .downcast::<App>()
        .ok_or_else(|| anyhow::anyhow!("root is not the app"))?;
    let nav = app
        .nav()
        .ok_or_else(|| anyhow::anyhow!("navigator was not installed"))?;

    for id in [1, 2] {
        let ctx = ctx.clone();
        nav.push_state(Screen::Details(id), PushFlag::Default, move || {
            Node::new(&ctx, Page::new("details"))
        })?;
    }
    let dialog_ctx = ctx.clone();
    nav.push_state(Screen::Confirm, PushFlag::Transient, move || {
        Node::new(&dialog_ctx, Page::new("confirm"))
    })?;
    log::info!("stack: {:?} (top {:?})", nav.states(), nav.peek_state());

    while root.handle_back_press() {
        log::info!("back -> {:?}", nav.peek_state());
    }

    let home_ctx = ctx.clone();
    nav.push_state(Screen::Home, PushFlag::ClearTop, move || {
        Node::new(&home_ctx, Page::new("home"))
    })?;

    let saved = root.save_state();
    println!("{}", saved.to_json()?);

    root.dispatch_detach()?;
    Ok(())
}
