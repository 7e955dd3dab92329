//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable
//! Given-When-Then syntax. Several actions can be applied in sequence, which
//! suits reducers whose invariants must hold after every step.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use storefront_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for per-step invariant checks
type Invariant<S> = Box<dyn Fn(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// # Example
///
/// ```ignore
/// ReducerTest::new(CartReducer)
///     .with_env(())
///     .given_state(CartState::default())
///     .when_action(CartAction::AddOrAdjust { product: headphones(), delta: 1 })
///     .when_action(CartAction::AddOrAdjust { product: headphones(), delta: -1 })
///     .invariant(|cart| assert!(cart.lines().iter().all(|l| l.quantity > 0)))
///     .then_state(|cart| assert!(cart.is_empty()))
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    invariants: Vec<Invariant<S>>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            invariants: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Append an action to apply (When)
    ///
    /// Actions run in the order they were added.
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Append several actions to apply in order (When)
    #[must_use]
    pub fn when_actions(mut self, actions: impl IntoIterator<Item = A>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Check a property of the state after every single action
    #[must_use]
    pub fn invariant<F>(mut self, check: F) -> Self
    where
        F: Fn(&S) + 'static,
    {
        self.invariants.push(Box::new(check));
        self
    }

    /// Add an assertion about the final state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the effects of the last action (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, environment or at least one action is not
    /// set, or if any assertion fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");
        let env = self
            .environment
            .expect("Environment must be set with with_env()");
        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

        let mut effects = Vec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env).into_vec();
            for check in &self.invariants {
                check(&state);
            }
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }

        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use storefront_core::effect::Effect;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if any effect would do something when executed.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "Expected no effects, but found {effects:?}"
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "Expected at least one Future effect, but none found"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::{SmallVec, smallvec};

    #[derive(Clone, Debug, Default)]
    struct Basket {
        units: u32,
    }

    #[derive(Clone, Debug)]
    enum BasketAction {
        Put(u32),
        Take(u32),
        Checkout,
    }

    struct BasketReducer;

    impl Reducer for BasketReducer {
        type State = Basket;
        type Action = BasketAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                BasketAction::Put(n) => state.units += n,
                BasketAction::Take(n) => state.units = state.units.saturating_sub(n),
                BasketAction::Checkout => {
                    return smallvec![Effect::future(async { BasketAction::Take(u32::MAX) })];
                },
            }
            smallvec![Effect::None]
        }
    }

    #[test]
    fn applies_actions_in_order() {
        ReducerTest::new(BasketReducer)
            .with_env(())
            .given_state(Basket::default())
            .when_actions([BasketAction::Put(3), BasketAction::Take(1)])
            .then_state(|basket| assert_eq!(basket.units, 2))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn invariant_runs_after_each_step() {
        ReducerTest::new(BasketReducer)
            .with_env(())
            .given_state(Basket { units: 1 })
            .when_action(BasketAction::Take(5))
            .when_action(BasketAction::Put(2))
            .invariant(|basket| assert!(basket.units <= 2))
            .then_state(|basket| assert_eq!(basket.units, 2))
            .run();
    }

    #[test]
    fn effects_come_from_last_action() {
        ReducerTest::new(BasketReducer)
            .with_env(())
            .given_state(Basket::default())
            .when_action(BasketAction::Put(1))
            .when_action(BasketAction::Checkout)
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }
}
