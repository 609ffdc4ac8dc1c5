// Showcase Tests
//
// This is a meta-package that organizes the workspace integration tests.
// It doesn't contain test code itself; see the [[test]] targets.
