//! End-to-end weaving: registration, table construction, and chain
//! execution against the same members.

use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::rc::Rc;
use std::sync::{Arc, Mutex, PoisonError};

use rstest::{fixture, rstest};
use weaver::{
    Advice, AspectRegistry, CallSite, CompilationUnit, InterceptorChain, InvocationError,
    JoinPointTable, MemberBody, MemberKey, Value, Visibility, value,
};

#[derive(Debug)]
struct Denied;

impl fmt::Display for Denied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("access denied")
    }
}

impl Error for Denied {}

type Journal = Arc<Mutex<Vec<String>>>;

fn note(journal: &Journal, entry: impl Into<String>) {
    journal
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(entry.into());
}

fn entries(journal: &Journal) -> Vec<String> {
    journal
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

struct Weaving {
    journal: Journal,
    table: Arc<JoinPointTable>,
}

fn unit() -> CompilationUnit {
    CompilationUnit::new(
        "src/Accounts.php",
        [
            CallSite::method("bank.Accounts", "balance"),
            CallSite::method("bank.Accounts", "withdraw"),
            CallSite::method("bank.Accounts", "audit").with_visibility(Visibility::Private),
            CallSite::function("bank.math", "factorial"),
        ],
    )
}

#[fixture]
fn weaving() -> Weaving {
    let journal = Journal::default();
    let mut registry = AspectRegistry::new();

    let log = Arc::clone(&journal);
    let trace = Advice::around("Trace", "calls", move |invocation| {
        note(&log, format!("enter {}", invocation.call_site().member_name));
        let result = invocation.proceed();
        note(&log, format!("exit {}", invocation.call_site().member_name));
        result
    })
    .with_order(-10);

    let log = Arc::clone(&journal);
    let guard = Advice::before("Security", "check", move |invocation| {
        let amount = invocation.argument_as::<i64>(0).map_or(0, |n| *n);
        note(&log, format!("check {amount}"));
        if amount > 100 {
            Err(InvocationError::raise(Denied))
        } else {
            Ok(())
        }
    });

    let log = Arc::clone(&journal);
    let rollback = Advice::after_throwing("Tx", "rollback", move |invocation| {
        let reason = invocation
            .raised()
            .map_or_else(String::new, ToString::to_string);
        note(&log, format!("rollback: {reason}"));
        Ok(())
    });

    let pairs = [
        ("execution:public bank.Accounts->*", trace),
        ("execution:bank.Accounts->withdraw & args:1", guard),
        ("execution:bank..->withdraw", rollback),
    ];
    for (pointcut, advice) in pairs {
        registry
            .register_advice(pointcut, advice)
            .unwrap_or_else(|err| panic!("`{pointcut}` should register: {err}"));
    }
    let table = registry
        .build_table(&unit())
        .unwrap_or_else(|err| panic!("table should build: {err}"));
    Weaving { journal, table }
}

fn chain_for(table: &JoinPointTable, site: &CallSite, body: MemberBody) -> InterceptorChain {
    table
        .chain(&MemberKey::of(site), body)
        .unwrap_or_else(|| panic!("{site} should be woven"))
}

fn withdraw_body(journal: &Journal) -> MemberBody {
    let log = Arc::clone(journal);
    MemberBody::new(move |invocation| {
        let amount = invocation.argument_as::<i64>(0).map_or(0, |n| *n);
        note(&log, format!("withdraw {amount}"));
        Ok(value(1000 - amount))
    })
}

#[rstest]
fn only_selected_members_are_woven(weaving: Weaving) {
    let woven: Vec<String> = weaving
        .table
        .entries()
        .map(|entry| entry.call_site.member_name.clone())
        .collect();
    assert_eq!(woven, vec!["balance", "withdraw"]);
}

#[rstest]
fn permitted_call_runs_every_advice_in_order(weaving: Weaving) {
    let site = CallSite::method("bank.Accounts", "withdraw");
    let chain = chain_for(&weaving.table, &site, withdraw_body(&weaving.journal));
    let result = chain
        .invoke(Some(value("account")), vec![value(40_i64)])
        .unwrap_or_else(|err| panic!("withdrawal should succeed: {err}"));
    assert_eq!(result.downcast_ref::<i64>(), Some(&960));
    assert_eq!(
        entries(&weaving.journal),
        vec!["check 40", "enter withdraw", "withdraw 40", "exit withdraw"]
    );
}

#[rstest]
fn refused_call_never_reaches_the_body(weaving: Weaving) {
    let site = CallSite::method("bank.Accounts", "withdraw");
    let chain = chain_for(&weaving.table, &site, withdraw_body(&weaving.journal));
    let Err(err) = chain.invoke(Some(value("account")), vec![value(500_i64)]) else {
        panic!("withdrawal should be refused");
    };
    assert!(err.downcast_ref::<Denied>().is_some());
    // the guard fails before any inner advice runs
    assert_eq!(entries(&weaving.journal), vec!["check 500"]);
}

#[rstest]
fn guard_is_skipped_for_other_arities(weaving: Weaving) {
    let site = CallSite::method("bank.Accounts", "withdraw");
    let chain = chain_for(&weaving.table, &site, withdraw_body(&weaving.journal));
    let result = chain
        .invoke(None, vec![value(500_i64), value("memo")])
        .unwrap_or_else(|err| panic!("two-argument call bypasses the guard: {err}"));
    assert_eq!(result.downcast_ref::<i64>(), Some(&500));
    assert_eq!(
        entries(&weaving.journal),
        vec!["enter withdraw", "withdraw 500", "exit withdraw"]
    );
}

#[rstest]
fn failing_body_rolls_back(weaving: Weaving) {
    let site = CallSite::method("bank.Accounts", "withdraw");
    let chain = chain_for(
        &weaving.table,
        &site,
        MemberBody::new(|_| Err(InvocationError::raise(Denied))),
    );
    assert!(chain.invoke(None, vec![value(5_i64)]).is_err());
    assert_eq!(
        entries(&weaving.journal),
        vec![
            "check 5",
            "enter withdraw",
            "rollback: access denied",
            "exit withdraw"
        ]
    );
}

#[rstest]
fn unwoven_members_have_no_chain(weaving: Weaving) {
    let audit = CallSite::method("bank.Accounts", "audit").with_visibility(Visibility::Private);
    assert!(
        weaving
            .table
            .chain(&MemberKey::of(&audit), MemberBody::new(|_| Ok(weaver::unit())))
            .is_none()
    );
}

#[test]
fn recursive_member_reenters_its_own_chain() {
    let mut registry = AspectRegistry::new();
    let depths = Rc::new(RefCell::new(Vec::new()));
    registry
        .register_advice(
            "function:bank.math.factorial",
            Advice::before("Trace", "depth", |_| Ok(())),
        )
        .unwrap_or_else(|err| panic!("pointcut should register: {err}"));
    let table = registry
        .build_table(&unit())
        .unwrap_or_else(|err| panic!("table should build: {err}"));

    let site = CallSite::function("bank.math", "factorial");
    let chain: Rc<RefCell<Option<Rc<InterceptorChain>>>> = Rc::default();
    let handle = Rc::clone(&chain);
    let seen = Rc::clone(&depths);
    let body = MemberBody::new(move |invocation| {
        let n = invocation.argument_as::<u64>(0).map_or(0, |n| *n);
        seen.borrow_mut().push(invocation.chain().depth());
        if n <= 1 {
            return Ok(value(1_u64));
        }
        let Some(this) = handle.borrow().clone() else {
            return Ok(value(0_u64));
        };
        let inner = this.invoke(None, vec![value(n - 1)])?;
        let inner = inner.downcast_ref::<u64>().copied().unwrap_or_default();
        Ok(value(n * inner))
    });
    let woven = Rc::new(chain_for(&table, &site, body));
    *chain.borrow_mut() = Some(Rc::clone(&woven));

    let result: Value = woven
        .invoke(None, vec![value(5_u64)])
        .unwrap_or_else(|err| panic!("factorial should succeed: {err}"));
    assert_eq!(result.downcast_ref::<u64>(), Some(&120));
    assert_eq!(*depths.borrow(), vec![0, 1, 2, 3, 4]);
    assert_eq!(woven.depth(), 0);
    // break the cycle between the chain and its body
    chain.borrow_mut().take();
}
