use std::cell::{Cell, RefCell};
use std::rc::Rc;

use arbor_core::{Bundle, Interactor, InteractorHandle, Node, TreeContext, TreeError};

use crate::{AttachTransition, DetachTransition, Navigator, PushFlag};

type Log = Rc<RefCell<Vec<String>>>;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Page {
    label: &'static str,
    log: Log,
}

impl Interactor for Page {
    fn did_become_active(&self, _handle: &InteractorHandle, _saved: Option<&Bundle>) {
        self.log.borrow_mut().push(format!("{}:active", self.label));
    }

    fn will_resign_active(&self, _handle: &InteractorHandle) {
        self.log.borrow_mut().push(format!("{}:resign", self.label));
    }
}

struct Root;
impl Interactor for Root {}

struct Screen {
    label: &'static str,
    ctx: TreeContext,
    log: Log,
}

impl AttachTransition<&'static str> for Screen {
    fn build_router(&self) -> Node {
        self.log.borrow_mut().push(format!("{}:build", self.label));
        Node::builder(
            &self.ctx,
            Page {
                label: self.label,
                log: self.log.clone(),
            },
        )
        .tag(self.label)
        .build()
    }

    fn will_attach_to_host(
        &self,
        _router: &Node,
        previous: Option<&&'static str>,
        _new: &&'static str,
        is_push: bool,
    ) {
        self.log.borrow_mut().push(format!(
            "{}:will_attach from={} push={is_push}",
            self.label,
            previous.copied().unwrap_or("-")
        ));
    }
}

impl DetachTransition<&'static str> for Screen {
    fn will_detach_from_host(
        &self,
        _router: &Node,
        _previous: &&'static str,
        new: Option<&&'static str>,
        is_push: bool,
    ) {
        self.log.borrow_mut().push(format!(
            "{}:will_detach to={} push={is_push}",
            self.label,
            new.copied().unwrap_or("-")
        ));
    }

    fn on_post_detach_from_host(&self, _router: &Node, _new: Option<&&'static str>, _is_push: bool) {
        self.log
            .borrow_mut()
            .push(format!("{}:post_detach", self.label));
    }
}

struct Harness {
    ctx: TreeContext,
    host: Node,
    nav: Navigator<&'static str>,
    log: Log,
}

impl Harness {
    fn new() -> Self {
        init_logging();
        let ctx = TreeContext::default();
        let host = Node::new(&ctx, Root);
        host.dispatch_attach(None).unwrap();
        let nav = Navigator::new(&host);
        Self {
            ctx,
            host,
            nav,
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn screen(&self, label: &'static str) -> Screen {
        Screen {
            label,
            ctx: self.ctx.clone(),
            log: self.log.clone(),
        }
    }

    fn push(&self, label: &'static str, flag: PushFlag) {
        self.nav
            .push_state_with_detach(label, flag, self.screen(label), self.screen(label))
            .unwrap();
        self.assert_only_top_attached();
    }

    fn pop(&self) {
        self.nav.pop_state().unwrap();
        self.assert_only_top_attached();
    }

    /// Returns and clears the log.
    fn take_log(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.borrow_mut())
    }

    fn count(&self, entry: &str) -> usize {
        self.log.borrow().iter().filter(|e| *e == entry).count()
    }

    fn assert_only_top_attached(&self) {
        let children = self.host.children();
        match self.nav.peek_router() {
            Some(top) => {
                assert_eq!(children.len(), 1, "host children: {children:?}");
                assert!(children[0].ptr_eq(&top));
                assert!(top.is_attached());
            }
            None => assert!(children.is_empty()),
        }
    }
}

#[test]
fn test_push_then_pop_restores_previous_top() {
    let h = Harness::new();
    h.push("A", PushFlag::Default);
    h.push("B", PushFlag::Default);
    h.take_log();

    h.pop();
    assert_eq!(
        h.take_log(),
        vec![
            "B:will_detach to=A push=false",
            "B:resign",
            "B:post_detach",
            "A:will_attach from=B push=false",
            "A:active",
        ]
    );
    assert_eq!(h.nav.peek_state(), Some("A"));
    assert_eq!(h.nav.size(), 1);
}

#[test]
fn test_push_runs_the_full_transition_protocol() {
    let h = Harness::new();
    h.push("A", PushFlag::Default);
    assert_eq!(
        h.take_log(),
        vec!["A:build", "A:will_attach from=- push=true", "A:active"]
    );

    h.push("B", PushFlag::Default);
    assert_eq!(
        h.take_log(),
        vec![
            "A:will_detach to=B push=true",
            "A:resign",
            "A:post_detach",
            "B:build",
            "B:will_attach from=A push=true",
            "B:active",
        ]
    );
    assert_eq!(h.nav.states(), vec!["A", "B"]);
}

#[test]
fn test_default_push_of_top_state_rebuilds_it() {
    let h = Harness::new();
    h.push("A", PushFlag::Default);
    let first = h.nav.peek_router().unwrap();
    h.push("A", PushFlag::Default);

    assert_eq!(h.count("A:build"), 2);
    assert_eq!(h.count("A:will_detach to=A push=true"), 1);
    assert!(!first.ptr_eq(&h.nav.peek_router().unwrap()));
    assert!(!first.is_attached());
    assert_eq!(h.nav.size(), 2);
}

#[test]
fn test_router_is_built_once_per_entry() {
    let h = Harness::new();
    h.push("A", PushFlag::Default);
    h.push("B", PushFlag::Default);
    h.pop();
    h.push("C", PushFlag::Default);
    h.pop();

    assert_eq!(h.count("A:build"), 1);
    assert_eq!(h.count("A:active"), 3);
}

#[test]
fn test_transient_lives_outside_the_stack() {
    let h = Harness::new();
    h.push("A", PushFlag::Default);
    h.push("T", PushFlag::Transient);

    assert_eq!(h.nav.size(), 2);
    assert_eq!(h.nav.states(), vec!["A"]);
    assert_eq!(h.nav.peek_state(), Some("T"));

    h.take_log();
    h.push("T", PushFlag::Transient);
    assert!(h.take_log().is_empty());

    h.pop();
    assert_eq!(h.nav.peek_state(), Some("A"));
    assert_eq!(h.nav.size(), 1);
    assert_eq!(
        h.take_log(),
        vec![
            "T:will_detach to=A push=false",
            "T:resign",
            "T:post_detach",
            "A:will_attach from=T push=false",
            "A:active",
        ]
    );
}

#[test]
fn test_next_push_discards_the_transient_entry() {
    let h = Harness::new();
    h.push("A", PushFlag::Default);
    h.push("B", PushFlag::Transient);
    h.push("C", PushFlag::Default);
    assert_eq!(h.nav.states(), vec!["A", "C"]);
    assert_eq!(h.nav.size(), 2);
    h.take_log();

    h.pop();
    let log = h.take_log();
    assert_eq!(log[0], "C:will_detach to=A push=false");
    assert!(log.contains(&"A:active".to_string()));
    assert!(!log.iter().any(|e| e.starts_with("B:")));
    assert_eq!(h.nav.peek_state(), Some("A"));
}

#[test]
fn test_single_top_leaves_one_occurrence() {
    let h = Harness::new();
    h.push("A", PushFlag::Default);
    h.push("B", PushFlag::Default);
    h.push("A", PushFlag::Default);
    h.push("C", PushFlag::Default);
    assert_eq!(h.nav.size(), 4);

    h.push("A", PushFlag::SingleTop);
    assert_eq!(h.nav.states(), vec!["B", "C", "A"]);
    assert_eq!(h.nav.size(), 3);

    h.take_log();
    h.push("A", PushFlag::SingleTop);
    assert!(h.take_log().is_empty());
}

#[test]
fn test_clear_top_exposes_the_existing_entry() {
    let h = Harness::new();
    for label in ["A", "B", "C", "D"] {
        h.push(label, PushFlag::Default);
    }
    h.push("B", PushFlag::ClearTop);

    assert_eq!(h.nav.states(), vec!["A", "B"]);
    assert_eq!(h.nav.size(), 2);
    assert_eq!(h.count("B:build"), 1);
    assert_eq!(h.count("B:active"), 2);
    assert_eq!(h.count("C:will_detach to=D push=true"), 1);
    assert_eq!(h.count("D:will_detach to=B push=true"), 1);
    assert_eq!(h.count("C:resign"), 1);
    assert_eq!(h.count("D:resign"), 1);
    assert_eq!(h.count("B:will_attach from=D push=true"), 1);
}

#[test]
fn test_clear_top_of_missing_state_pushes() {
    let h = Harness::new();
    h.push("A", PushFlag::Default);
    h.push("B", PushFlag::ClearTop);
    assert_eq!(h.nav.states(), vec!["A", "B"]);

    h.take_log();
    h.push("B", PushFlag::ClearTop);
    assert!(h.take_log().is_empty());
}

#[test]
fn test_reorder_to_top_keeps_intervening_entries() {
    let h = Harness::new();
    for label in ["A", "B", "C"] {
        h.push(label, PushFlag::Default);
    }
    h.push("A", PushFlag::ReorderToTop);

    assert_eq!(h.nav.states(), vec!["B", "C", "A"]);
    assert_eq!(h.count("A:build"), 1);

    h.push("D", PushFlag::ReorderToTop);
    assert_eq!(h.nav.states(), vec!["B", "C", "A", "D"]);
}

#[test]
fn test_new_task_on_top_state_truncates_silently() {
    let h = Harness::new();
    for label in ["A", "B", "C"] {
        h.push(label, PushFlag::Default);
    }
    h.take_log();

    h.push("C", PushFlag::NewTask);
    assert!(h.take_log().is_empty());
    assert_eq!(h.nav.states(), vec!["C"]);
    assert_eq!(h.nav.size(), 1);
}

#[test]
fn test_new_task_with_other_state_replaces_everything() {
    let h = Harness::new();
    for label in ["A", "B", "C"] {
        h.push(label, PushFlag::Default);
    }
    h.take_log();

    h.push("D", PushFlag::NewTask);
    assert_eq!(h.nav.states(), vec!["D"]);
    assert_eq!(h.count("C:will_detach to=D push=true"), 1);
    assert_eq!(h.count("C:resign"), 1);
    assert_eq!(h.count("D:active"), 1);
    assert!(!h.take_log().iter().any(|e| e.starts_with("A:") || e.starts_with("B:")));

    h.pop();
    assert!(h.nav.is_empty());
}

#[test]
fn test_new_task_replace_rebuilds_even_the_top() {
    let h = Harness::new();
    h.push("A", PushFlag::Default);
    h.push("B", PushFlag::Default);
    h.push("B", PushFlag::NewTaskReplace);

    assert_eq!(h.nav.states(), vec!["B"]);
    assert_eq!(h.count("B:build"), 2);
    assert_eq!(h.count("B:resign"), 1);
    assert_eq!(h.count("B:active"), 2);
}

#[test]
fn test_replace_top_swaps_the_top_entry() {
    let h = Harness::new();
    h.push("A", PushFlag::Default);
    h.push("B", PushFlag::Default);
    h.push("C", PushFlag::ReplaceTop);

    assert_eq!(h.nav.states(), vec!["A", "C"]);
    assert_eq!(h.count("B:resign"), 1);

    h.pop();
    assert_eq!(h.nav.peek_state(), Some("A"));
}

#[test]
fn test_replace_top_with_same_state_detaches_the_old_router() {
    let h = Harness::new();
    h.push("A", PushFlag::Default);
    let old = h.nav.peek_router().unwrap();
    h.push("A", PushFlag::ReplaceTop);

    assert_eq!(h.nav.states(), vec!["A"]);
    assert!(!old.is_attached());
    assert_eq!(h.count("A:build"), 2);
}

#[test]
fn test_pop_on_empty_navigator_is_a_no_op() {
    let h = Harness::new();
    h.pop();
    assert_eq!(h.nav.size(), 0);
    assert_eq!(h.nav.peek_state(), None);
    assert!(h.nav.peek_router().is_none());
    assert!(h.take_log().is_empty());
}

#[test]
fn test_popping_the_last_entry_empties_the_host() {
    let h = Harness::new();
    h.push("A", PushFlag::Default);
    h.take_log();
    h.pop();
    assert_eq!(
        h.take_log(),
        vec!["A:will_detach to=- push=false", "A:resign", "A:post_detach"]
    );
    assert!(h.host.children().is_empty());
}

#[test]
fn test_detach_all_clears_both_slots() {
    let h = Harness::new();
    h.push("A", PushFlag::Default);
    h.push("T", PushFlag::Transient);
    h.take_log();

    h.nav.detach_all().unwrap();
    assert_eq!(
        h.take_log(),
        vec!["T:will_detach to=- push=false", "T:resign", "T:post_detach"]
    );
    assert!(h.nav.is_empty());
    assert!(h.host.children().is_empty());
}

#[test]
fn test_closure_attach_transition() {
    let h = Harness::new();
    let ctx = h.ctx.clone();
    let log = h.log.clone();
    h.nav
        .push_state("A", PushFlag::Default, move || {
            Node::new(
                &ctx,
                Page {
                    label: "A",
                    log: log.clone(),
                },
            )
        })
        .unwrap();
    assert_eq!(h.take_log(), vec!["A:active"]);
    h.assert_only_top_attached();
}

struct Redirect {
    nav: Navigator<&'static str>,
    screen: RefCell<Option<Screen>>,
}

impl Interactor for Redirect {
    fn did_become_active(&self, _handle: &InteractorHandle, _saved: Option<&Bundle>) {
        if let Some(next) = self.screen.borrow_mut().take() {
            self.nav
                .push_state(next.label, PushFlag::Default, next)
                .unwrap();
        }
    }
}

#[test]
fn test_push_from_inside_attach_is_safe() {
    let h = Harness::new();
    let ctx = h.ctx.clone();
    let nav = h.nav.clone();
    let next = h.screen("B");
    h.nav
        .push_state("A", PushFlag::Default, move || {
            Node::new(
                &ctx,
                Redirect {
                    nav: nav.clone(),
                    screen: RefCell::new(Some(Screen {
                        label: next.label,
                        ctx: next.ctx.clone(),
                        log: next.log.clone(),
                    })),
                },
            )
        })
        .unwrap();

    assert_eq!(h.nav.states(), vec!["A", "B"]);
    assert_eq!(h.nav.peek_state(), Some("B"));
    h.assert_only_top_attached();
    assert_eq!(h.count("B:active"), 1);
}

#[test]
fn test_will_attach_to_host_event_is_published() {
    let h = Harness::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    let _sub = h
        .ctx
        .events()
        .subscribe(move |e| s.borrow_mut().push(format!("{e:?}")));

    h.push("A", PushFlag::Default);
    assert_eq!(
        *seen.borrow(),
        vec!["WillAttachToHost(Page -> Root)", "Attached(Page -> Root)"]
    );
}

#[test]
fn test_released_host_is_an_error() {
    let ctx = TreeContext::default();
    let host = Node::new(&ctx, Root);
    let nav: Navigator<&'static str> = Navigator::new(&host);
    drop(host);

    let result = nav.push_state("A", PushFlag::Default, move || Node::new(&ctx, Root));
    assert!(matches!(result, Err(TreeError::HostReleased)));
    assert!(matches!(nav.pop_state(), Err(TreeError::HostReleased)));
}

#[derive(Clone, Copy)]
enum Move {
    Push(&'static str),
    Pop,
}

/// Navigates away, once, from inside its own `will_attach_to_host`.
struct Detour {
    label: &'static str,
    ctx: TreeContext,
    log: Log,
    nav: Navigator<&'static str>,
    then: Cell<Option<Move>>,
}

impl AttachTransition<&'static str> for Detour {
    fn build_router(&self) -> Node {
        Node::new(
            &self.ctx,
            Page {
                label: self.label,
                log: self.log.clone(),
            },
        )
    }

    fn will_attach_to_host(
        &self,
        _router: &Node,
        _previous: Option<&&'static str>,
        _new: &&'static str,
        _is_push: bool,
    ) {
        match self.then.take() {
            Some(Move::Push(next)) => {
                let screen = Screen {
                    label: next,
                    ctx: self.ctx.clone(),
                    log: self.log.clone(),
                };
                self.nav.push_state(next, PushFlag::Default, screen).unwrap();
            }
            Some(Move::Pop) => self.nav.pop_state().unwrap(),
            None => {}
        }
    }
}

#[test]
fn test_push_from_will_attach_to_host_attaches_only_the_new_top() {
    let h = Harness::new();
    let detour = Detour {
        label: "A",
        ctx: h.ctx.clone(),
        log: h.log.clone(),
        nav: h.nav.clone(),
        then: Cell::new(Some(Move::Push("B"))),
    };
    h.nav.push_state("A", PushFlag::Default, detour).unwrap();

    assert_eq!(h.nav.states(), vec!["A", "B"]);
    assert_eq!(h.nav.peek_state(), Some("B"));
    h.assert_only_top_attached();
    assert_eq!(h.count("A:active"), 0);
    assert_eq!(h.count("B:active"), 1);

    h.pop();
    assert_eq!(h.nav.peek_state(), Some("A"));
    assert_eq!(h.count("A:active"), 1);
}

#[test]
fn test_pop_from_will_attach_to_host_restores_the_previous_entry() {
    let h = Harness::new();
    h.push("A", PushFlag::Default);
    let detour = Detour {
        label: "B",
        ctx: h.ctx.clone(),
        log: h.log.clone(),
        nav: h.nav.clone(),
        then: Cell::new(Some(Move::Pop)),
    };
    h.nav.push_state("B", PushFlag::Default, detour).unwrap();

    assert_eq!(h.nav.states(), vec!["A"]);
    h.assert_only_top_attached();
    assert_eq!(h.count("A:active"), 2);
    assert_eq!(h.count("B:active"), 0);
}

#[test]
fn test_flags_targeting_the_retained_top_under_a_transient() {
    for flag in [
        PushFlag::ClearTop,
        PushFlag::ReorderToTop,
        PushFlag::SingleTop,
        PushFlag::NewTask,
    ] {
        let h = Harness::new();
        h.push("A", PushFlag::Default);
        h.push("T", PushFlag::Transient);
        h.take_log();

        h.push("A", flag);
        let rebuilt = matches!(flag, PushFlag::SingleTop | PushFlag::NewTask);
        let mut expected = vec![
            "T:will_detach to=A push=true",
            "T:resign",
            "T:post_detach",
        ];
        if rebuilt {
            expected.push("A:build");
        }
        expected.extend(["A:will_attach from=T push=true", "A:active"]);

        assert_eq!(h.take_log(), expected, "{flag:?}");
        assert_eq!(h.nav.states(), vec!["A"], "{flag:?}");
        assert_eq!(h.nav.peek_state(), Some("A"), "{flag:?}");
        assert_eq!(h.nav.size(), 1, "{flag:?}");
    }
}

#[test]
fn test_transient_replaces_an_earlier_transient() {
    let h = Harness::new();
    h.push("T1", PushFlag::Transient);
    h.push("T2", PushFlag::Transient);

    assert_eq!(h.nav.size(), 1);
    assert!(h.nav.states().is_empty());
    assert_eq!(h.nav.peek_state(), Some("T2"));
    assert_eq!(h.count("T1:will_detach to=T2 push=true"), 1);
    assert_eq!(h.count("T2:will_attach from=T1 push=true"), 1);

    h.pop();
    assert!(h.nav.is_empty());
    assert_eq!(h.count("T1:active"), 1);
}
